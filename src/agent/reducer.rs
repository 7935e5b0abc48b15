//! Reduction of an invocation's event stream to one answer string.
//!
//! Precedence is final response, then accumulated intermediate text, then
//! the [`NO_RESPONSE`] sentinel. Consumption stops at the first final
//! response. Failures become an error sentinel string rather than an error
//! value so the caller always receives prose.

use std::fmt::Display;
use std::ops::ControlFlow;

use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::events::{join_text, AgentEvent};
use super::runtime::AgentError;

pub const NO_RESPONSE: &str = "Error: No response received from Travel Agent.";

/// Sentinel returned when invoking the agent or consuming its stream fails.
pub fn execution_error(err: impl Display) -> String {
    format!("Error during agent execution: {}", err)
}

/// Incremental state of the reduction.
#[derive(Debug, Default)]
pub struct ResponseReducer {
    final_response: Option<String>,
    accumulated_text: String,
}

impl ResponseReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event. `Break` means no further events are needed.
    pub fn observe(&mut self, event: AgentEvent) -> ControlFlow<()> {
        debug!(kind = event.kind(), "Received event");

        match event {
            AgentEvent::FinalResponse { parts } => {
                let text = join_text(&parts);
                debug!(len = text.len(), "Final response received");
                self.final_response = Some(text);
                return ControlFlow::Break(());
            }
            AgentEvent::IntermediateResponse { parts } => {
                let text = join_text(&parts);
                debug!(text = text.as_str(), "Intermediate response");
                self.accumulated_text.push_str(&text);
            }
            AgentEvent::ToolInvocation { name, args } => {
                debug!(tool = name.as_str(), %args, "Tool invocation");
            }
            AgentEvent::ToolResult { name, result } => {
                debug!(tool = name.as_str(), %result, "Tool result");
            }
        }

        ControlFlow::Continue(())
    }

    /// The answer given everything observed so far.
    pub fn finish(self) -> String {
        if let Some(final_response) = self.final_response {
            info!("Agent run finished with a final response");
            final_response
        } else if !self.accumulated_text.is_empty() {
            info!("Agent run finished with intermediate text but no final response");
            self.accumulated_text
        } else {
            warn!("Agent run finished without any response text");
            NO_RESPONSE.to_string()
        }
    }
}

/// Consume `events` and produce the answer string.
pub async fn reduce_events<S>(events: S) -> String
where
    S: Stream<Item = Result<AgentEvent, AgentError>>,
{
    match try_reduce(events).await {
        Ok(answer) => answer,
        Err(e) => {
            error!(error = %e, "Agent execution failed");
            execution_error(e)
        }
    }
}

async fn try_reduce<S>(events: S) -> Result<String, AgentError>
where
    S: Stream<Item = Result<AgentEvent, AgentError>>,
{
    let mut events = std::pin::pin!(events);
    let mut reducer = ResponseReducer::new();

    while let Some(event) = events.next().await {
        if reducer.observe(event?).is_break() {
            break;
        }
    }

    Ok(reducer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::events::Part;
    use crate::llm::LlmError;
    use futures::stream;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ok_stream(events: Vec<AgentEvent>) -> impl Stream<Item = Result<AgentEvent, AgentError>> {
        stream::iter(events.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn final_response_wins_over_intermediate_text() {
        let events = vec![
            AgentEvent::intermediate_text("Let me check. "),
            AgentEvent::ToolInvocation {
                name: "get_current_time".to_string(),
                args: json!({}),
            },
            AgentEvent::ToolResult {
                name: "get_current_time".to_string(),
                result: json!({"current_time": "2024-05-01 10:00:00"}),
            },
            AgentEvent::FinalResponse {
                parts: vec![Part::text("Spring "), Part::default(), Part::text("is ideal.")],
            },
        ];

        assert_eq!(reduce_events(ok_stream(events)).await, "Spring is ideal.");
    }

    #[tokio::test]
    async fn intermediate_text_is_concatenated_in_order() {
        let events = vec![
            AgentEvent::intermediate_text("Pack "),
            AgentEvent::ToolInvocation {
                name: "web_search".to_string(),
                args: json!({"query": "Rome weather"}),
            },
            AgentEvent::intermediate_text("layers."),
        ];

        assert_eq!(reduce_events(ok_stream(events)).await, "Pack layers.");
    }

    #[tokio::test]
    async fn empty_stream_yields_sentinel() {
        assert_eq!(reduce_events(ok_stream(Vec::new())).await, NO_RESPONSE);
    }

    #[tokio::test]
    async fn tool_events_alone_yield_sentinel() {
        let events = vec![AgentEvent::ToolInvocation {
            name: "get_current_time".to_string(),
            args: json!({}),
        }];
        assert_eq!(reduce_events(ok_stream(events)).await, NO_RESPONSE);
    }

    #[tokio::test]
    async fn empty_final_response_is_still_returned() {
        let events = vec![
            AgentEvent::intermediate_text("partial"),
            AgentEvent::FinalResponse { parts: vec![Part::default()] },
        ];
        assert_eq!(reduce_events(ok_stream(events)).await, "");
    }

    #[tokio::test]
    async fn stops_consuming_after_first_final_response() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let events = stream::iter(vec![
            AgentEvent::final_text("first"),
            AgentEvent::final_text("second"),
            AgentEvent::intermediate_text("late"),
        ])
        .map(move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(event)
        });

        assert_eq!(reduce_events(events).await, "first");
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_error_becomes_error_sentinel() {
        let events = stream::iter(vec![
            Ok(AgentEvent::intermediate_text("partial")),
            Err(AgentError::Llm(LlmError::InvalidResponse("boom".to_string()))),
        ]);

        assert_eq!(
            reduce_events(events).await,
            "Error during agent execution: model API returned invalid response: boom"
        );
    }

    #[tokio::test]
    async fn error_after_final_response_is_never_seen() {
        let events = stream::iter(vec![
            Ok(AgentEvent::final_text("done")),
            Err(AgentError::MaxIterations(3)),
        ]);

        assert_eq!(reduce_events(events).await, "done");
    }

    #[test]
    fn observe_reports_break_only_on_final() {
        let mut reducer = ResponseReducer::new();
        assert!(reducer
            .observe(AgentEvent::intermediate_text("a"))
            .is_continue());
        assert!(reducer.observe(AgentEvent::final_text("b")).is_break());
        assert_eq!(reducer.finish(), "b");
    }
}
