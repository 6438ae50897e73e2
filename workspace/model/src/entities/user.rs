use sea_orm::entity::prelude::*;
use sea_orm::TransactionTrait;

/// A registered account holder.
///
/// Freshly registered users are created with `is_active = false` and
/// `is_activated = false`; both flip to true once the signed activation
/// token from the registration email comes back.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Plaintext passwords are never stored.
    pub password_hash: String,
    /// Whether the account finished email activation.
    pub is_activated: bool,
    /// Whether the user wants notifications about new comments.
    pub send_messages: bool,
    pub is_staff: bool,
    /// Inactive users cannot log in.
    pub is_active: bool,
    pub joined_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A user authors multiple adverts.
    #[sea_orm(has_many = "super::advert::Entity")]
    Advert,
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
}

impl Related<super::advert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advert.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Deletes the user together with every advert they authored.
    ///
    /// Each advert takes its dependents (images, comments, ratings) with it,
    /// all inside one transaction. Returns the media paths that no longer
    /// have a database row, so the caller can unlink the files.
    pub async fn delete_with_adverts(self, db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
        let txn = db.begin().await?;

        let adverts = super::advert::Entity::find()
            .filter(super::advert::Column::AuthorId.eq(self.id))
            .all(&txn)
            .await?;

        let mut orphaned_media = Vec::new();
        for advert in adverts {
            orphaned_media.extend(advert.delete_within(&txn).await?);
        }

        Entity::delete_by_id(self.id).exec(&txn).await?;
        txn.commit().await?;

        Ok(orphaned_media)
    }
}
