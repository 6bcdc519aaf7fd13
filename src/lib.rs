//! # Support Agent
//!
//! A retrieval-augmented support agent for a single API product.
//!
//! This library provides:
//! - A knowledge store that embeds API documentation and ranks it by cosine similarity
//! - A tool-based agent loop that answers user questions from that documentation
//! - An HTTP API for conversations and document ingestion
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a user message for a conversation
//! 2. Replay the transcript to the LLM with the system prompt and available tools
//! 3. Execute any tool calls (documentation search) and record their results
//! 4. Repeat until the LLM marks a reply as meant for the user
//!
//! ## Example
//!
//! ```rust,ignore
//! use support_agent::{api, Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod knowledge;
pub mod llm;
pub mod tools;

#[cfg(test)]
mod testing;

pub use config::Config;
