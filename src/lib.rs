//! # Travel Planner
//!
//! An AI travel planning backend.
//!
//! This library provides:
//! - An HTTP API that answers free-form travel questions
//! - A tool-based agent loop backed by Google Gemini
//! - Tools for the current time, daily cost estimates and web search
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a prompt via the API
//! 2. Build context with system prompt and available tools
//! 3. Call the model, execute any tool calls it requests
//! 4. Feed results back to the model, repeat until it answers
//!
//! The resulting event stream is reduced to one answer string: the final
//! response if there is one, otherwise the intermediate text, otherwise an
//! error sentinel.
//!
//! ## Example
//!
//! ```rust,ignore
//! use travel_planner::{api, config::Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
