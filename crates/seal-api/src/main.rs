//! # seal-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the seal tracking backend.
//! Binds to configurable port (default 3000).

use seal_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        e
    })?;
    let port = config.port;

    let state = AppState::new(config).map_err(|e| {
        tracing::error!("Database pool initialization failed: {e}");
        e
    })?;

    // Apply embedded migrations before serving.
    seal_api::db::run_migrations(&state.db).await.map_err(|e| {
        tracing::error!("Migration failed: {e}");
        e
    })?;

    let app = seal_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Seal API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
