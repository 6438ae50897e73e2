use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Select};

/// A listing category.
///
/// Rubrics form a two-level hierarchy in a single table: rows with
/// `super_rubric_id = NULL` are super-rubrics, rows pointing at a
/// super-rubric are the sub-rubrics adverts get filed under.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rubrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    /// Manual sort weight; listings are ordered by (order, name).
    pub order: i16,
    /// Self-referencing foreign key; NULL marks a super-rubric.
    pub super_rubric_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Parent super-rubric of a sub-rubric.
    #[sea_orm(belongs_to = "Entity", from = "Column::SuperRubricId", to = "Column::Id")]
    Parent,
    #[sea_orm(has_many = "super::advert::Entity")]
    Advert,
}

impl Related<Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parent.def()
    }

    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Top-level rubrics, ordered by (order, name).
    pub fn find_super() -> Select<Entity> {
        Self::find()
            .filter(Column::SuperRubricId.is_null())
            .order_by_asc(Column::Order)
            .order_by_asc(Column::Name)
    }

    /// Rubrics that adverts can be filed under, ordered by (order, name).
    pub fn find_sub() -> Select<Entity> {
        Self::find()
            .filter(Column::SuperRubricId.is_not_null())
            .order_by_asc(Column::Order)
            .order_by_asc(Column::Name)
    }

    /// Looks up a sub-rubric by id. A super-rubric id yields `None`; the two
    /// levels are distinct namespaces as far as callers are concerned.
    pub async fn find_sub_by_id(
        db: &DatabaseConnection,
        id: i32,
    ) -> Result<Option<Model>, DbErr> {
        Self::find_by_id(id)
            .filter(Column::SuperRubricId.is_not_null())
            .one(db)
            .await
    }
}

impl Model {
    pub fn is_super(&self) -> bool {
        self.super_rubric_id.is_none()
    }

    /// Direct sub-rubrics of this rubric, ordered by (order, name).
    pub async fn children(&self, db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SuperRubricId.eq(self.id))
            .order_by_asc(Column::Order)
            .order_by_asc(Column::Name)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::SqliteQueryBuilder;
    use sea_orm::{Database, DbBackend, Schema, Set, Statement};

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let schema = Schema::new(DbBackend::Sqlite);
        let stmt = schema.create_table_from_entity(Entity);
        let statement =
            Statement::from_string(DbBackend::Sqlite, stmt.to_string(SqliteQueryBuilder));
        db.execute(statement).await.unwrap();

        db
    }

    async fn create_rubric(
        db: &DatabaseConnection,
        name: &str,
        order: i16,
        super_rubric_id: Option<i32>,
    ) -> Model {
        let rubric = ActiveModel {
            name: Set(name.to_string()),
            order: Set(order),
            super_rubric_id: Set(super_rubric_id),
            ..Default::default()
        };

        rubric.insert(db).await.unwrap()
    }

    #[tokio::test]
    async fn test_super_and_sub_split() {
        let db = setup_test_db().await;

        let electronics = create_rubric(&db, "Electronics", 0, None).await;
        let household = create_rubric(&db, "Household", 1, None).await;
        create_rubric(&db, "Phones", 0, Some(electronics.id)).await;
        create_rubric(&db, "Lamps", 0, Some(household.id)).await;

        let supers = Entity::find_super().all(&db).await.unwrap();
        assert_eq!(supers.len(), 2);
        assert!(supers.iter().all(|r| r.is_super()));

        let subs = Entity::find_sub().all(&db).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|r| !r.is_super()));
    }

    #[tokio::test]
    async fn test_ordering_by_order_then_name() {
        let db = setup_test_db().await;

        create_rubric(&db, "Zoo", 0, None).await;
        create_rubric(&db, "Auto", 1, None).await;
        create_rubric(&db, "Books", 0, None).await;

        let supers = Entity::find_super().all(&db).await.unwrap();
        let names: Vec<&str> = supers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Books", "Zoo", "Auto"]);
    }

    #[tokio::test]
    async fn test_children() {
        let db = setup_test_db().await;

        let root = create_rubric(&db, "Electronics", 0, None).await;
        create_rubric(&db, "Phones", 1, Some(root.id)).await;
        create_rubric(&db, "Audio", 0, Some(root.id)).await;

        let children = root.children(&db).await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "Audio");
        assert_eq!(children[1].name, "Phones");
    }

    #[tokio::test]
    async fn test_find_sub_by_id_rejects_super_rubric() {
        let db = setup_test_db().await;

        let root = create_rubric(&db, "Electronics", 0, None).await;
        let sub = create_rubric(&db, "Phones", 0, Some(root.id)).await;

        assert!(Entity::find_sub_by_id(&db, root.id).await.unwrap().is_none());
        let found = Entity::find_sub_by_id(&db, sub.id).await.unwrap().unwrap();
        assert_eq!(found.id, sub.id);
        assert!(Entity::find_sub_by_id(&db, 9999).await.unwrap().is_none());
    }
}
