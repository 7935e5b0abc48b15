use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One fragment of model output. Non-text fragments carry no `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Concatenate the text of `parts` in order, skipping parts without text.
pub fn join_text(parts: &[Part]) -> String {
    parts.iter().filter_map(|p| p.text.as_deref()).collect()
}

/// Events produced by a single agent invocation, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Agent is calling a tool.
    ToolInvocation { name: String, args: Value },
    /// Tool execution completed.
    ToolResult { name: String, result: Value },
    /// Partial text produced before the answer is complete.
    IntermediateResponse { parts: Vec<Part> },
    /// The completed answer.
    FinalResponse { parts: Vec<Part> },
}

impl AgentEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolInvocation { .. } => "tool_invocation",
            Self::ToolResult { .. } => "tool_result",
            Self::IntermediateResponse { .. } => "intermediate_response",
            Self::FinalResponse { .. } => "final_response",
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self::FinalResponse {
            parts: vec![Part::text(text)],
        }
    }

    pub fn intermediate_text(text: impl Into<String>) -> Self {
        Self::IntermediateResponse {
            parts: vec![Part::text(text)],
        }
    }
}
