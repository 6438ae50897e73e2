use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::Set;

/// One user's score for one advert.
///
/// The (advert_id, user_id) pair is unique; re-voting rewrites the existing
/// row through [`upsert`] instead of growing the table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub advert_id: i32,
    pub user_id: i32,
    /// Score between 1 and 5 inclusive.
    pub score: i16,
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
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::advert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advert.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Atomically saves a user's score for an advert.
///
/// An existing (advert_id, user_id) row is updated in place. A missing row is
/// inserted with an ON CONFLICT clause on the unique pair, so a concurrent
/// first vote from the same user degrades into the update path at the store
/// level instead of surfacing a duplicate-key error or a second row.
///
/// Returns the resulting row and `true` when a new row was created.
pub async fn upsert(
    db: &DatabaseConnection,
    advert_id: i32,
    user_id: i32,
    score: i16,
) -> Result<(Model, bool), DbErr> {
    if !(1..=5).contains(&score) {
        return Err(DbErr::Custom(format!(
            "rating score {score} out of range 1..=5"
        )));
    }

    let existing = Entity::find()
        .filter(Column::AdvertId.eq(advert_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?;

    match existing {
        Some(rating) => {
            let mut active: ActiveModel = rating.into();
            active.score = Set(score);
            let updated = active.update(db).await?;
            Ok((updated, false))
        }
        None => {
            let new_rating = ActiveModel {
                advert_id: Set(advert_id),
                user_id: Set(user_id),
                score: Set(score),
                created_at: Set(Utc::now()),
                ..Default::default()
            };

            let saved = Entity::insert(new_rating)
                .on_conflict(
                    OnConflict::columns([Column::AdvertId, Column::UserId])
                        .update_column(Column::Score)
                        .to_owned(),
                )
                .exec_with_returning(db)
                .await?;
            Ok((saved, true))
        }
    }
}
