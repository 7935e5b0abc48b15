//! API request and response types.

use serde::{Deserialize, Serialize};

/// Request body of `POST /travel-plan`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TravelPrompt {
    /// The traveller's question
    pub prompt: String,
}

/// Response body of `POST /travel-plan`.
///
/// `response` is either the agent's answer or a human-readable error
/// sentinel; both are delivered with status 200.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TravelResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
