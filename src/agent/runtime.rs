//! Boundary between the session layer and whatever executes the agent.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use super::events::AgentEvent;
use super::session::{SessionError, SessionKey};
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Max iterations ({0}) reached without completion")]
    MaxIterations(usize),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionKey),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Ordered events of one invocation. An `Err` item ends the stream.
pub type EventStream = BoxStream<'static, Result<AgentEvent, AgentError>>;

/// Executes a prompt within a conversation and streams what happens.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(&self, session: &SessionKey, prompt: &str) -> Result<EventStream, AgentError>;
}
