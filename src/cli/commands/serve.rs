use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::{get_bind_address, initialize_app_state, initialize_app_state_with_url};
use crate::router::create_router;
use crate::schemas::AppState;

/// Start the web server with state from the environment.
pub async fn serve() -> Result<()> {
    let state = initialize_app_state().await?;
    run_server(state).await
}

/// Start the web server against an explicit database URL.
pub async fn serve_with_url(database_url: &str) -> Result<()> {
    let state = initialize_app_state_with_url(database_url).await?;
    run_server(state).await
}

async fn run_server(state: AppState) -> Result<()> {
    info!("Adboard application starting up");

    let app = create_router(state);
    debug!("Router created successfully");

    let bind_address = get_bind_address();
    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(bind_error) => {
            error!("Failed to bind to address {}: {}", bind_address, bind_error);
            return Err(bind_error.into());
        }
    };

    info!("Adboard API server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    if let Err(serve_error) = axum::serve(listener, app).await {
        error!("Server error: {}", serve_error);
        return Err(serve_error.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
