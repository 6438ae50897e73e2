use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::Email))
                    .col(string(Users::PasswordHash))
                    .col(boolean(Users::IsActivated).default(false))
                    .col(boolean(Users::SendMessages).default(true))
                    .col(boolean(Users::IsStaff).default(false))
                    .col(boolean(Users::IsActive).default(false))
                    .col(timestamp_with_time_zone(Users::JoinedAt))
                    .to_owned(),
            )
            .await?;

        // Create rubrics table (self-referencing two-level tree)
        manager
            .create_table(
                Table::create()
                    .table(Rubrics::Table)
                    .if_not_exists()
                    .col(pk_auto(Rubrics::Id))
                    .col(string_len(Rubrics::Name, 20).unique_key())
                    .col(small_integer(Rubrics::Order).default(0))
                    .col(integer_null(Rubrics::SuperRubricId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rubric_super_rubric")
                            .from(Rubrics::Table, Rubrics::SuperRubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create adverts table
        manager
            .create_table(
                Table::create()
                    .table(Adverts::Table)
                    .if_not_exists()
                    .col(pk_auto(Adverts::Id))
                    .col(integer(Adverts::RubricId))
                    .col(string_len(Adverts::Title, 40))
                    .col(text(Adverts::Content))
                    .col(decimal(Adverts::Price).default(0))
                    .col(text(Adverts::Contacts))
                    .col(string_null(Adverts::Image))
                    .col(integer(Adverts::AuthorId))
                    .col(boolean(Adverts::IsActive).default(true))
                    .col(timestamp_with_time_zone(Adverts::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_advert_rubric")
                            .from(Adverts::Table, Adverts::RubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_advert_author")
                            .from(Adverts::Table, Adverts::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_adverts_active_created")
                    .table(Adverts::Table)
                    .col(Adverts::IsActive)
                    .col(Adverts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Create advert_images table
        manager
            .create_table(
                Table::create()
                    .table(AdvertImages::Table)
                    .if_not_exists()
                    .col(pk_auto(AdvertImages::Id))
                    .col(integer(AdvertImages::AdvertId))
                    .col(string(AdvertImages::Image))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_advert_image_advert")
                            .from(AdvertImages::Table, AdvertImages::AdvertId)
                            .to(Adverts::Table, Adverts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create comments table
        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(pk_auto(Comments::Id))
                    .col(integer(Comments::AdvertId))
                    .col(string_len(Comments::Author, 30))
                    .col(text(Comments::Content))
                    .col(boolean(Comments::IsActive).default(true))
                    .col(timestamp_with_time_zone(Comments::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_advert")
                            .from(Comments::Table, Comments::AdvertId)
                            .to(Adverts::Table, Adverts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_advert_created")
                    .table(Comments::Table)
                    .col(Comments::AdvertId)
                    .col(Comments::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Create ratings table with the unique (advert_id, user_id) pair the
        // upsert relies on
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(pk_auto(Ratings::Id))
                    .col(integer(Ratings::AdvertId))
                    .col(integer(Ratings::UserId))
                    .col(small_integer(Ratings::Score))
                    .col(timestamp_with_time_zone(Ratings::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_advert")
                            .from(Ratings::Table, Ratings::AdvertId)
                            .to(Adverts::Table, Adverts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_user")
                            .from(Ratings::Table, Ratings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_advert_user")
                    .table(Ratings::Table)
                    .col(Ratings::AdvertId)
                    .col(Ratings::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvertImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Adverts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rubrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    IsActivated,
    SendMessages,
    IsStaff,
    IsActive,
    JoinedAt,
}

#[derive(DeriveIden)]
enum Rubrics {
    Table,
    Id,
    Name,
    Order,
    SuperRubricId,
}

#[derive(DeriveIden)]
enum Adverts {
    Table,
    Id,
    RubricId,
    Title,
    Content,
    Price,
    Contacts,
    Image,
    AuthorId,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdvertImages {
    Table,
    Id,
    AdvertId,
    Image,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    AdvertId,
    Author,
    Content,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    AdvertId,
    UserId,
    Score,
    CreatedAt,
}
