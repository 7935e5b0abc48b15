//! Web search: the SerpAPI client and the general-purpose search tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::Tool;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("SERPAPI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Invalid search URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Search request failed: {0}")]
    Network(reqwest::Error),

    #[error("Search API returned {0}")]
    Status(u16),

    #[error("Search API error: {0}")]
    Api(String),
}

// The request URL carries the API key; strip it before it reaches any message.
impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.without_url())
    }
}

/// One organic search result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

/// Web search backend.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Top `num` organic results for `query`, in ranking order.
    async fn search(&self, query: &str, num: usize) -> Result<Vec<SearchResult>, SearchError>;
}

/// Google results through SerpAPI.
pub struct SerpApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SerpApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SearchResult>,
    error: Option<String>,
}

#[async_trait]
impl SearchClient for SerpApiClient {
    async fn search(&self, query: &str, num: usize) -> Result<Vec<SearchResult>, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::MissingApiKey)?;

        let num = num.to_string();
        let endpoint = format!("{}/search", self.base_url.trim_end_matches('/'));
        let url = url::Url::parse_with_params(
            &endpoint,
            &[
                ("q", query),
                ("api_key", api_key),
                ("engine", "google"),
                ("num", num.as_str()),
            ],
        )?;

        tracing::debug!(query, num = num.as_str(), "Sending request to SerpAPI");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let data: SerpApiResponse = match response.json().await {
            Ok(data) => data,
            Err(_) if !status.is_success() => return Err(SearchError::Status(status.as_u16())),
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = data.error {
            return Err(SearchError::Api(error));
        }
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        Ok(data.organic_results)
    }
}

/// Upper bound on results the model may request per search.
const MAX_RESULTS: usize = 10;

/// Search the web and return titles, snippets and links.
pub struct WebSearch {
    search: Arc<dyn SearchClient>,
}

impl WebSearch {
    pub fn new(search: Arc<dyn SearchClient>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns search results with titles and snippets. Use for opening hours, events, weather, visa rules, or other current travel information."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;
        let num_results = args["num_results"]
            .as_u64()
            .unwrap_or(5)
            .clamp(1, MAX_RESULTS as u64) as usize;

        let results = self.search.search(query, num_results).await?;

        let formatted: Vec<String> = results
            .iter()
            .filter_map(|r| {
                let title = r.title.as_deref()?;
                Some(format!(
                    "**{}**\n{}\nURL: {}",
                    title,
                    r.snippet.as_deref().unwrap_or("No snippet"),
                    r.link.as_deref().unwrap_or("")
                ))
            })
            .collect();

        if formatted.is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(formatted.join("\n\n"))
        }
    }
}
