use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing::{debug, error, info};

pub async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let db: DatabaseConnection = match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(connect_error) => {
            error!(
                "Failed to connect to database '{}': {}",
                database_url, connect_error
            );
            return Err(connect_error.into());
        }
    };

    info!("Running database migrations");
    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Database migrations completed successfully");
        }
        Err(migrate_error) => {
            error!("Failed to run database migrations: {}", migrate_error);
            return Err(migrate_error.into());
        }
    }

    info!("Database initialization completed successfully!");
    Ok(())
}
