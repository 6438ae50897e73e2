use std::path::PathBuf;

use anyhow::Result;
use sea_orm::Database;

use crate::auth::Signer;
use crate::media::MediaStore;
use crate::schemas::AppState;

/// Initialize application configuration and state
pub async fn initialize_app_state() -> Result<AppState> {
    // Load configuration
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://adboard.db".to_string());

    initialize_app_state_with_url(&database_url).await
}

/// Initialize application state against an explicit database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    let secret = std::env::var("ADBOARD_SECRET_KEY").unwrap_or_else(|_| {
        tracing::warn!("ADBOARD_SECRET_KEY is not set, using an insecure development key");
        "insecure-development-key".to_string()
    });
    let signer = Signer::new(&secret)
        .map_err(|e| anyhow::anyhow!("failed to build token signer: {e}"))?;

    let media_root =
        std::env::var("ADBOARD_MEDIA_ROOT").unwrap_or_else(|_| "media".to_string());
    let media = MediaStore::new(PathBuf::from(media_root));

    let page_size = std::env::var("ADBOARD_PAGE_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2);

    Ok(AppState {
        db,
        signer,
        media,
        page_size,
    })
}

/// Get bind address from environment or use default
pub fn get_bind_address() -> String {
    std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
