//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::conversation::ConversationStatus;
use crate::knowledge::{DocumentEntry, NewDocument};

/// Request to open a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct StartConversationRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartConversationResponse {
    pub conversation_id: Uuid,
    pub status: ConversationStatus,
}

/// A user message for an existing conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,

    /// Must match the user the conversation was started for
    pub user_id: String,

    pub message: String,
}

/// The agent's final reply for one user message.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResponse {
    pub agent: String,
}

/// API documentation entry as submitted by operators.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertDocRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub response: Value,
}

impl From<InsertDocRequest> for NewDocument {
    fn from(req: InsertDocRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            data: req.data,
            response: req.response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub status: bool,
    pub message: String,
    pub id: String,
}

/// Query string of `POST /docs/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub description_query: String,

    /// Falls back to the configured default when absent
    pub top_n: Option<usize>,
}

/// A search hit without its embedding.
#[derive(Debug, Clone, Serialize)]
pub struct ApiDocResponse {
    pub name: String,
    pub description: String,
    pub data: Option<Map<String, Value>>,
    pub response: Value,
}

impl From<DocumentEntry> for ApiDocResponse {
    fn from(entry: DocumentEntry) -> Self {
        Self {
            name: entry.name,
            description: entry.description,
            data: entry.data,
            response: entry.response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
