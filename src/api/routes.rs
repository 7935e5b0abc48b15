//! HTTP route definitions and shared application state.

use std::sync::Arc;

use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::travel;
use super::types::{HealthResponse, WelcomeResponse};
use crate::agent::SessionRegistry;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Shared application state.
pub struct AppState {
    pub registry: SessionRegistry,
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .route("/travel-plan", post(travel::travel_plan))
        .route("/app", get(app))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the AI Travel Planner API",
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn app() -> Html<&'static str> {
    Html(INDEX_HTML)
}
