//! The travel planning endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

use super::routes::AppState;
use super::types::{TravelPrompt, TravelResponse};

pub const EMPTY_PROMPT: &str = "Error: Prompt must not be empty.";

/// `POST /travel-plan`
///
/// Always answers 200. Agent failures arrive as prose in `response`.
pub async fn travel_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TravelPrompt>,
) -> Json<TravelResponse> {
    if req.prompt.trim().is_empty() {
        warn!("Rejected empty travel prompt");
        return Json(TravelResponse {
            response: EMPTY_PROMPT.to_string(),
        });
    }

    let session = state.registry.default_session();
    let response = session.respond(&req.prompt).await;
    info!(session = %session.key(), len = response.len(), "Travel plan ready");

    Json(TravelResponse { response })
}
