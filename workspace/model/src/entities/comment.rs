use sea_orm::entity::prelude::*;

/// A comment on an advert.
///
/// Guests pick their own display name; for logged-in commenters the handler
/// pins `author` to the account's username. Comments are visible immediately
/// (`is_active` defaults to true) — there is no moderation queue.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub advert_id: i32,
    /// Display name of the commenter.
    pub author: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
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
