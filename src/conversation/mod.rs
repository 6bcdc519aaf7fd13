//! Conversations and their append-only message transcripts.
//!
//! The transcript is replayed to the model on every turn, so message order
//! is the insertion order and stored messages are never rewritten.

mod locks;
mod memory;
mod sqlite;

pub use locks::ConversationLocks;
pub use memory::InMemoryConversationStore;
pub use sqlite::SqliteConversationStore;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Conversation {0} not found")]
    NotFound(Uuid),

    #[error("Conversation storage error: {0}")]
    Persistence(String),
}

pub type ConversationResult<T> = Result<T, ConversationError>;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(format!("unknown message role: {}", other)),
        }
    }
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    MessageSent,
}

/// Lifecycle status of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Started,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
        }
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            other => Err(format!("unknown conversation status: {}", other)),
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,

    /// Name of the tool that produced this message (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Id of the model's tool call this message answers (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Raw arguments of that tool call (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_arguments: Option<String>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            status: MessageStatus::MessageSent,
            timestamp: Utc::now(),
            tool_name: None,
            tool_call_id: None,
            tool_arguments: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn tool(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            tool_call_id: Some(call_id.into()),
            tool_arguments: Some(arguments.into()),
            ..Self::new(MessageRole::Tool, content)
        }
    }
}

/// One support session with its transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: String,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            status: ConversationStatus::Started,
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }
}

/// Conversation accessor used by the agent loop and the HTTP layer.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Start a conversation for `user_id` and return its id.
    async fn start(&self, user_id: &str) -> ConversationResult<Uuid>;

    /// Load a conversation with its full transcript.
    async fn get(&self, id: Uuid) -> ConversationResult<Conversation>;

    /// Append one message to the end of the transcript.
    async fn append_message(&self, id: Uuid, message: Message) -> ConversationResult<()>;
}
