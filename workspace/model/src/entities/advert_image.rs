use sea_orm::entity::prelude::*;

/// An additional illustration attached to an advert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "advert_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub advert_id: i32,
    /// Relative media path of the stored file.
    pub image: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::advert::Entity",
        from = "Column::AdvertId",
        to = "super::advert::Column::Id"
    )]
    Advert,
}

impl Related<super::advert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advert.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
