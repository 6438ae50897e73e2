use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryOrder, TransactionTrait};

/// A classified advert.
///
/// Belongs to a sub-rubric and an author. The primary image plus any
/// additional images live on disk; the rows only carry relative media paths.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "adverts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Sub-rubric the advert is filed under.
    pub rubric_id: i32,
    pub title: String,
    pub content: String,
    pub price: Decimal,
    pub contacts: String,
    /// Relative media path of the primary image, when one was uploaded.
    pub image: Option<String>,
    pub author_id: i32,
    /// Inactive adverts are hidden from public listings but kept for the author.
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rubric::Entity",
        from = "Column::RubricId",
        to = "super::rubric::Column::Id"
    )]
    Rubric,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,
    #[sea_orm(has_many = "super::advert_image::Entity")]
    AdvertImage,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
}

impl Related<super::rubric::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rubric.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::advert_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvertImage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Arithmetic mean of all scores for this advert, 0.0 when nobody voted.
    pub async fn average_rating(&self, db: &DatabaseConnection) -> Result<f64, DbErr> {
        let ratings = super::rating::Entity::find()
            .filter(super::rating::Column::AdvertId.eq(self.id))
            .all(db)
            .await?;

        if ratings.is_empty() {
            return Ok(0.0);
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(r.score)).sum();
        Ok(sum as f64 / ratings.len() as f64)
    }

    pub async fn rating_count(&self, db: &DatabaseConnection) -> Result<u64, DbErr> {
        super::rating::Entity::find()
            .filter(super::rating::Column::AdvertId.eq(self.id))
            .count(db)
            .await
    }

    pub async fn additional_images(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Vec<super::advert_image::Model>, DbErr> {
        super::advert_image::Entity::find()
            .filter(super::advert_image::Column::AdvertId.eq(self.id))
            .all(db)
            .await
    }

    /// Visible comments on this advert, oldest first.
    pub async fn active_comments(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Vec<super::comment::Model>, DbErr> {
        super::comment::Entity::find()
            .filter(super::comment::Column::AdvertId.eq(self.id))
            .filter(super::comment::Column::IsActive.eq(true))
            .order_by_asc(super::comment::Column::CreatedAt)
            .order_by_asc(super::comment::Column::Id)
            .all(db)
            .await
    }

    /// Deletes the advert together with its images, comments and ratings in
    /// one transaction. Returns the media paths whose rows are gone so the
    /// caller can unlink the files afterwards.
    pub async fn delete_with_dependents(
        self,
        db: &DatabaseConnection,
    ) -> Result<Vec<String>, DbErr> {
        let txn = db.begin().await?;
        let orphaned_media = self.delete_within(&txn).await?;
        txn.commit().await?;
        Ok(orphaned_media)
    }

    /// Row-level part of the cascade, reusable from a surrounding
    /// transaction (the user-delete cascade goes through here too).
    pub(crate) async fn delete_within<C: ConnectionTrait>(
        self,
        conn: &C,
    ) -> Result<Vec<String>, DbErr> {
        let mut orphaned_media = Vec::new();

        let images = super::advert_image::Entity::find()
            .filter(super::advert_image::Column::AdvertId.eq(self.id))
            .all(conn)
            .await?;
        orphaned_media.extend(images.into_iter().map(|i| i.image));

        super::advert_image::Entity::delete_many()
            .filter(super::advert_image::Column::AdvertId.eq(self.id))
            .exec(conn)
            .await?;
        super::rating::Entity::delete_many()
            .filter(super::rating::Column::AdvertId.eq(self.id))
            .exec(conn)
            .await?;
        super::comment::Entity::delete_many()
            .filter(super::comment::Column::AdvertId.eq(self.id))
            .exec(conn)
            .await?;

        if let Some(image) = self.image.clone() {
            orphaned_media.push(image);
        }

        Entity::delete_by_id(self.id).exec(conn).await?;

        Ok(orphaned_media)
    }
}
