//! HTTP API for the travel planner.
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `GET /health` - Health check
//! - `POST /travel-plan` - Ask the travel agent a question
//! - `GET /app` - Browser form for `/travel-plan`

mod routes;
mod travel;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::agent::{Agent, InMemorySessionService, SessionKey, SessionRegistry};
use crate::config::Config;

pub use routes::{build_router, AppState};
pub use travel::EMPTY_PROMPT;

/// Build the agent and the default session, then serve until shutdown.
///
/// Fails before binding if the default session cannot be created.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let agent = Agent::new(&config);
    info!(
        tools = ?agent.tools().list_tools().iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        "Travel agent ready"
    );

    let registry = SessionRegistry::new(
        Arc::new(agent),
        Arc::new(InMemorySessionService::new()),
        SessionKey::from(&config.session),
    )
    .await
    .context("Failed to create agent session")?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { registry });
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
