//! Core agent loop implementation.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use super::events::{AgentEvent, Part};
use super::prompt::build_system_prompt;
use super::runtime::{AgentError, AgentRuntime, EventStream};
use super::session::SessionKey;
use crate::config::Config;
use crate::llm::{ChatMessage, GeminiClient, LlmClient};
use crate::tools::{CurrentTime, EstimateExpense, SearchClient, SerpApiClient, ToolRegistry, WebSearch};

/// The travel planner agent.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    model: String,
    max_iterations: usize,
}

impl Agent {
    /// Create an agent backed by Gemini with the travel tools registered.
    pub fn new(config: &Config) -> Self {
        let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(
            config.gemini_base_url.clone(),
            config.api_key.clone(),
        ));
        let search: Arc<dyn SearchClient> = Arc::new(SerpApiClient::new(
            config.serpapi_base_url.clone(),
            config.serpapi_api_key.clone(),
        ));

        if config.serpapi_api_key.is_none() {
            tracing::warn!("SERPAPI_API_KEY not set; search-backed tools will report errors");
        }

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(CurrentTime));
        tools.register(Arc::new(EstimateExpense::new(
            search.clone(),
            llm.clone(),
            config.default_model.clone(),
        )));
        if config.enable_web_search {
            tools.register(Arc::new(WebSearch::new(search)));
        }

        Self::with_parts(llm, tools, config.default_model.clone(), config.max_iterations)
    }

    /// Create an agent from explicit parts.
    pub fn with_parts(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        model: impl Into<String>,
        max_iterations: usize,
    ) -> Self {
        Self {
            llm,
            tools: Arc::new(tools),
            model: model.into(),
            max_iterations,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

#[async_trait]
impl AgentRuntime for Agent {
    async fn run(&self, session: &SessionKey, prompt: &str) -> Result<EventStream, AgentError> {
        tracing::debug!(session = %session, model = self.model.as_str(), "Starting agent run");

        Ok(Box::pin(run_loop(
            self.llm.clone(),
            self.tools.clone(),
            self.model.clone(),
            self.max_iterations,
            prompt.to_string(),
        )))
    }
}

fn run_loop(
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    model: String,
    max_iterations: usize,
    prompt: String,
) -> impl Stream<Item = Result<AgentEvent, AgentError>> + Send + 'static {
    try_stream! {
        let mut messages = vec![
            ChatMessage::system(build_system_prompt(&tools)),
            ChatMessage::user(prompt),
        ];
        let tool_schemas = tools.get_tool_schemas();
        let mut finished = false;

        for iteration in 0..max_iterations {
            tracing::debug!("Agent iteration {}", iteration + 1);

            let response = llm
                .chat_completion(&model, &messages, Some(tool_schemas.as_slice()))
                .await?;

            let tool_calls = response.tool_calls.unwrap_or_default();

            // No tool calls - this is the final response
            if tool_calls.is_empty() {
                yield AgentEvent::FinalResponse {
                    parts: response.content.into_iter().map(Part::text).collect(),
                };
                finished = true;
                break;
            }

            if let Some(text) = response.content.clone() {
                yield AgentEvent::intermediate_text(text);
            }

            messages.push(ChatMessage::assistant(response.content, tool_calls.clone()));

            for tool_call in &tool_calls {
                let name = tool_call.function.name.clone();
                let args: Value = serde_json::from_str(&tool_call.function.arguments)
                    .unwrap_or(Value::Null);

                yield AgentEvent::ToolInvocation {
                    name: name.clone(),
                    args: args.clone(),
                };

                let output = match tools.execute(&name, args).await {
                    Ok(output) => output,
                    Err(e) => format!("Error: {}", e),
                };
                let result = serde_json::from_str(&output)
                    .unwrap_or_else(|_| Value::String(output.clone()));

                yield AgentEvent::ToolResult { name, result };

                messages.push(ChatMessage::tool_result(tool_call, output));
            }
        }

        if !finished {
            Err::<(), _>(AgentError::MaxIterations(max_iterations))?;
        }
    }
}
