//! SQLite-backed document store.
//!
//! Vectors and the JSON columns (`data`, `response`) are stored as JSON text.
//! Rows come back in insertion order via the `seq` autoincrement key.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use serde_json::Value;

use super::{DocumentEntry, DocumentStore, KnowledgeError, KnowledgeResult, Scan};

const SQL_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS api_docs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    data TEXT,
    response TEXT NOT NULL,
    vector TEXT,
    embedding_model TEXT
);";

const SQL_INSERT: &str = "
INSERT INTO api_docs (id, name, description, data, response, vector, embedding_model)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const SQL_SCAN: &str = "
SELECT id, name, description, data, response, vector, embedding_model
FROM api_docs ORDER BY seq";

pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> KnowledgeResult<Self> {
        let conn = Connection::open(path).map_err(persistence)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> KnowledgeResult<Self> {
        let conn = Connection::open_in_memory().map_err(persistence)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> KnowledgeResult<Self> {
        conn.execute_batch(SQL_SCHEMA).map_err(persistence)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> KnowledgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> KnowledgeResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| KnowledgeError::Persistence("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| KnowledgeError::Persistence(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn insert(&self, entry: DocumentEntry) -> KnowledgeResult<String> {
        let data = entry.data.as_ref().map(|d| Value::Object(d.clone()).to_string());
        let response = entry.response.to_string();
        let vector = if entry.embedding.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&entry.embedding).map_err(persistence)?)
        };

        self.with_conn(move |conn| {
            conn.execute(
                SQL_INSERT,
                params![
                    entry.id,
                    entry.name,
                    entry.description,
                    data,
                    response,
                    vector,
                    entry.embedding_model
                ],
            )
            .map_err(persistence)?;
            Ok(entry.id)
        })
        .await
    }

    async fn scan(&self) -> KnowledgeResult<Scan> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(SQL_SCAN).map_err(persistence)?;
            let mut rows = stmt.query([]).map_err(persistence)?;
            let mut scan = Scan::default();
            loop {
                match rows.next() {
                    Ok(Some(row)) => match decode_row(row) {
                        Ok(entry) => scan.entries.push(entry),
                        Err(e) => tracing::warn!("Skipping unreadable api_docs row: {}", e),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        scan.error = Some(e.to_string());
                        break;
                    }
                }
            }
            Ok(scan)
        })
        .await
    }
}

fn decode_row(row: &Row<'_>) -> rusqlite::Result<DocumentEntry> {
    let id: String = row.get(0)?;
    let data: Option<String> = row.get(3)?;
    let response: String = row.get(4)?;
    let vector: Option<String> = row.get(5)?;
    let embedding_model: Option<String> = row.get(6)?;

    let embedding = match vector {
        Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!("Doc {} has an unreadable vector: {}", id, e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    Ok(DocumentEntry {
        name: row.get(1)?,
        description: row.get(2)?,
        data: data
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            }),
        response: serde_json::from_str(&response).unwrap_or(Value::String(response)),
        embedding,
        embedding_model: embedding_model.unwrap_or_default(),
        id,
    })
}

fn persistence(err: impl std::fmt::Display) -> KnowledgeError {
    KnowledgeError::Persistence(err.to_string())
}
