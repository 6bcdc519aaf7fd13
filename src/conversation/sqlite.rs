//! SQLite-backed conversation store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{
    Conversation, ConversationError, ConversationResult, ConversationStatus, ConversationStore,
    Message, MessageStatus,
};

const SQL_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    tool_name TEXT,
    tool_call_id TEXT,
    tool_arguments TEXT
);
CREATE INDEX IF NOT EXISTS messages_by_conversation ON messages(conversation_id, seq);";

const SQL_INSERT_CONVERSATION: &str =
    "INSERT INTO conversations (id, user_id, status, created_at) VALUES (?1, ?2, ?3, ?4)";

const SQL_SELECT_CONVERSATION: &str =
    "SELECT user_id, status, created_at FROM conversations WHERE id = ?1";

const SQL_CONVERSATION_EXISTS: &str = "SELECT 1 FROM conversations WHERE id = ?1";

const SQL_INSERT_MESSAGE: &str = "
INSERT INTO messages (conversation_id, role, content, timestamp, tool_name, tool_call_id, tool_arguments)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const SQL_SELECT_MESSAGES: &str = "
SELECT role, content, timestamp, tool_name, tool_call_id, tool_arguments
FROM messages WHERE conversation_id = ?1 ORDER BY seq";

pub struct SqliteConversationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConversationStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> ConversationResult<Self> {
        let conn = Connection::open(path).map_err(persistence)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> ConversationResult<Self> {
        let conn = Connection::open_in_memory().map_err(persistence)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> ConversationResult<Self> {
        conn.execute_batch(SQL_SCHEMA).map_err(persistence)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> ConversationResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> ConversationResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| {
                ConversationError::Persistence("connection lock poisoned".to_string())
            })?;
            f(&guard)
        })
        .await
        .map_err(|e| ConversationError::Persistence(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn start(&self, user_id: &str) -> ConversationResult<Uuid> {
        let conversation = Conversation::new(user_id);
        self.with_conn(move |conn| {
            conn.execute(
                SQL_INSERT_CONVERSATION,
                params![
                    conversation.id.to_string(),
                    conversation.user_id,
                    conversation.status.as_str(),
                    conversation.created_at.to_rfc3339()
                ],
            )
            .map_err(persistence)?;
            Ok(conversation.id)
        })
        .await
    }

    async fn get(&self, id: Uuid) -> ConversationResult<Conversation> {
        self.with_conn(move |conn| {
            let key = id.to_string();
            let header: Option<(String, String, String)> = conn
                .query_row(SQL_SELECT_CONVERSATION, [&key], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .optional()
                .map_err(persistence)?;
            let (user_id, status, created_at) = header.ok_or(ConversationError::NotFound(id))?;

            let mut stmt = conn.prepare(SQL_SELECT_MESSAGES).map_err(persistence)?;
            let messages = stmt
                .query_map([&key], decode_message)
                .map_err(persistence)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(persistence)?;

            Ok(Conversation {
                id,
                user_id,
                status: status.parse().map_err(ConversationError::Persistence)?,
                created_at: parse_timestamp(&created_at).map_err(persistence)?,
                messages,
            })
        })
        .await
    }

    async fn append_message(&self, id: Uuid, message: Message) -> ConversationResult<()> {
        self.with_conn(move |conn| {
            let key = id.to_string();
            let exists = conn
                .query_row(SQL_CONVERSATION_EXISTS, [&key], |_| Ok(()))
                .optional()
                .map_err(persistence)?;
            if exists.is_none() {
                return Err(ConversationError::NotFound(id));
            }

            conn.execute(
                SQL_INSERT_MESSAGE,
                params![
                    key,
                    message.role.as_str(),
                    message.content,
                    message.timestamp.to_rfc3339(),
                    message.tool_name,
                    message.tool_call_id,
                    message.tool_arguments
                ],
            )
            .map_err(persistence)?;
            Ok(())
        })
        .await
    }
}

fn decode_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get(0)?;
    let timestamp: String = row.get(2)?;
    Ok(Message {
        role: role.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
        })?,
        content: row.get(1)?,
        status: MessageStatus::MessageSent,
        timestamp: parse_timestamp(&timestamp).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        tool_name: row.get(3)?,
        tool_call_id: row.get(4)?,
        tool_arguments: row.get(5)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

fn persistence(err: impl std::fmt::Display) -> ConversationError {
    ConversationError::Persistence(err.to_string())
}
