//! Tools the agent may call mid-reasoning.
//!
//! Each tool exposes a JSON schema for its arguments and returns a string
//! (usually JSON) that is fed back to the model as the call's result.

mod expense;
mod time;
mod web;

pub use expense::{extract_cost_from_snippets, extract_cost_from_text, EstimateExpense, EstimateStatus, ExpenseEstimate};
pub use time::{current_time, CurrentTime};
pub use web::{SearchClient, SearchError, SearchResult, SerpApiClient, WebSearch};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolSchema;

/// A function exposed to the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Name and description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Name-indexed set of tools available to one agent.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Run the named tool.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;
        tool.execute(args).await
    }
}
