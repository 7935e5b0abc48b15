//! Daily travel cost estimation.
//!
//! The estimate comes from the first dollar figure found in web search
//! snippets. When no snippet carries one, the model is asked directly and
//! the first 2-5 digit figure in its reply is used.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::web::SearchClient;
use super::Tool;
use crate::llm::LlmClient;

/// Number of organic results scanned for a price.
const SEARCH_RESULT_COUNT: usize = 5;

/// Longest digit run accepted from a snippet token.
const MAX_SNIPPET_DIGITS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStatus {
    Success,
    Error,
}

/// Result returned to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseEstimate {
    pub status: EstimateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Average daily cost in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_cost: Option<u32>,
    pub message: String,
}

impl ExpenseEstimate {
    pub fn success(destination: &str, daily_cost: u32) -> Self {
        Self {
            status: EstimateStatus::Success,
            destination: Some(destination.to_string()),
            daily_cost: Some(daily_cost),
            message: format!(
                "The average daily cost in {} is approximately ${}.",
                destination, daily_cost
            ),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: EstimateStatus::Error,
            destination: None,
            daily_cost: None,
            message: message.into(),
        }
    }
}

/// Scan snippets in order for the first usable dollar figure.
///
/// Within a snippet containing `$` or `USD`, thousands separators are
/// dropped and the first currency-marked token whose leading digit run is
/// 1-5 digits long and non-zero wins.
pub fn extract_cost_from_snippets<S: AsRef<str>>(snippets: &[S]) -> Option<u32> {
    snippets.iter().find_map(|s| extract_cost_from_snippet(s.as_ref()))
}

fn extract_cost_from_snippet(snippet: &str) -> Option<u32> {
    if !is_currency_marked(snippet) {
        return None;
    }

    let cleaned = snippet.replace(',', "");
    cleaned
        .split_whitespace()
        .filter(|token| is_currency_marked(token))
        .find_map(|token| {
            let digits: String = token
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if digits.is_empty() {
                return None;
            }
            if digits.len() > MAX_SNIPPET_DIGITS {
                warn!(token, "Ignoring implausibly long figure in snippet");
                return None;
            }
            digits.parse::<u32>().ok().filter(|v| *v > 0)
        })
}

fn is_currency_marked(text: &str) -> bool {
    text.contains('$') || text.contains("USD")
}

static COST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$?(\d{2,5})").unwrap());

/// First `$`-optional 2-5 digit figure in free text, commas ignored.
pub fn extract_cost_from_text(text: &str) -> Option<u32> {
    let cleaned = text.replace(',', "");
    let value = COST_RE
        .captures(&cleaned)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    match value {
        Some(v) => debug!(value = v, "Regex matched figure in model reply"),
        None => debug!("No figure found in model reply"),
    }
    value.filter(|v| *v > 0)
}

/// Estimates average daily travel cost for a destination.
pub struct EstimateExpense {
    search: Arc<dyn SearchClient>,
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl EstimateExpense {
    pub fn new(search: Arc<dyn SearchClient>, llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            search,
            llm,
            model: model.into(),
        }
    }

    /// Produce an estimate. Failures are reported in the result, never raised.
    pub async fn estimate(&self, destination: &str) -> ExpenseEstimate {
        debug!(destination, "Starting 'get_estimated_expense'");

        match self.try_estimate(destination).await {
            Ok(Some(daily_cost)) => {
                debug!(daily_cost, "Returning daily cost");
                ExpenseEstimate::success(destination, daily_cost)
            }
            Ok(None) => {
                error!(destination, "Unable to determine daily cost from search or model");
                ExpenseEstimate::error(format!(
                    "Could not determine travel cost for {}.",
                    destination
                ))
            }
            Err(e) => {
                error!(destination, error = %e, "Expense estimation failed");
                ExpenseEstimate::error(e.to_string())
            }
        }
    }

    async fn try_estimate(&self, destination: &str) -> anyhow::Result<Option<u32>> {
        let query = format!("Average travel cost in {} per day", destination);
        debug!(query = query.as_str(), "Formulated search query");

        let results = self.search.search(&query, SEARCH_RESULT_COUNT).await?;
        let snippets: Vec<String> = results.into_iter().filter_map(|r| r.snippet).collect();
        for snippet in &snippets {
            debug!(snippet = snippet.as_str(), "Search snippet");
        }

        if let Some(cost) = extract_cost_from_snippets(&snippets) {
            debug!(cost, "Extracted daily cost from snippet");
            return Ok(Some(cost));
        }

        debug!("Could not extract cost from snippets, falling back to the model");
        let prompt = format!(
            "What is the average daily cost in {} in USD for a tourist?",
            destination
        );
        let reply = self.llm.generate_text(&self.model, &prompt).await?;
        debug!(reply = reply.as_str(), "Model fallback reply");

        Ok(extract_cost_from_text(&reply))
    }
}

#[async_trait]
impl Tool for EstimateExpense {
    fn name(&self) -> &str {
        "get_estimated_expense"
    }

    fn description(&self) -> &str {
        "Estimate the average daily travel cost in US dollars for a destination, using web search results with a model fallback."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "destination": {
                    "type": "string",
                    "description": "Destination name, e.g. \"Bali\""
                }
            },
            "required": ["destination"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let estimate = match args["destination"].as_str().map(str::trim) {
            Some(destination) if !destination.is_empty() => self.estimate(destination).await,
            _ => ExpenseEstimate::error("Missing 'destination' argument"),
        };
        Ok(serde_json::to_string(&estimate)?)
    }
}
