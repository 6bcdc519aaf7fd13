//! Agent module - the support agent's conversation loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Append the user's message to the conversation
//! 2. Replay the transcript to the LLM with the available tools
//! 3. If the LLM requests tool calls, run them and append the results
//! 4. Repeat until the LLM marks a reply for the user or the turn cap is hit

mod agent_loop;
mod context;
mod prompt;

pub use agent_loop::{Agent, AgentError, AgentResult};
pub use context::build_messages;
pub use prompt::build_system_prompt;
