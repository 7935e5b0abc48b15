//! Travel Planner - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the travel agent.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_planner::{api, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travel_planner=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, web_search={}",
        config.default_model, config.enable_web_search
    );

    info!("Starting server on {}:{}", config.host, config.port);
    api::serve(config).await?;

    Ok(())
}
