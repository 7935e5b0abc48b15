//! Current local time.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

/// Timestamp layout returned to the model.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `{"current_time": "YYYY-MM-DD HH:MM:SS"}` in local time.
pub fn current_time() -> Value {
    json!({
        "current_time": chrono::Local::now().format(TIME_FORMAT).to_string(),
    })
}

pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current local time in the format YYYY-MM-DD HH:MM:SS. Use it to reason about seasons, upcoming dates, or how far away a trip is."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        tracing::debug!("Starting 'get_current_time'");
        Ok(current_time().to_string())
    }
}
