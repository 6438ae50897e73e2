use anyhow::Result;
use tracing::info;

use super::initdb::init_database;
use super::serve::serve_with_url;

/// Convenience for deployments: bring the schema up to date, then serve.
pub async fn migrate_and_serve(database_url: &str) -> Result<()> {
    info!("Running migrations before starting the server");
    init_database(database_url).await?;
    serve_with_url(database_url).await
}
