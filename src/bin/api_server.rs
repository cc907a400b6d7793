// API Server Binary Entry Point
//
// Purpose: Start the soil classification web app
// Usage: cargo run --bin api_server

use soil_sense::{create_router, AppConfig, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "soil_sense=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting soil classification server...");

    let config = AppConfig::from_env();
    config.log_summary();

    // Loads the recommendation table and the classifier model
    tracing::info!("Initializing application state...");
    let state = AppState::new(&config).await?;
    tracing::info!(
        "Application state initialized ({} soil types with recommendations)",
        state.recommendations.len()
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await?;

    Ok(())
}
