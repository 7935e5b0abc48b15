//! Agent module - bridges a prompt to a single answer string.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build context with the travel planner instruction and the user prompt
//! 2. Call the LLM with the available tools
//! 3. If the LLM requests tool calls, execute them and feed results back
//! 4. Repeat until the LLM produces a reply without tool calls
//!
//! Every step is published as an [`AgentEvent`]; [`reduce_events`] folds the
//! stream of one invocation into the text returned to the caller.

mod agent_loop;
mod events;
mod prompt;
mod reducer;
mod runtime;
mod session;

pub use agent_loop::Agent;
pub use events::{join_text, AgentEvent, Part};
pub use prompt::{build_system_prompt, TRAVEL_PLANNER_INSTRUCTION};
pub use reducer::{execution_error, reduce_events, ResponseReducer, NO_RESPONSE};
pub use runtime::{AgentError, AgentRuntime, EventStream};
pub use session::{
    AgentSession, InMemorySessionService, SessionError, SessionKey, SessionRecord, SessionRegistry,
    SessionService,
};
