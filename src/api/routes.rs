//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::agent::{build_system_prompt, Agent, AgentError};
use crate::config::Config;
use crate::conversation::{
    Conversation, ConversationError, ConversationLocks, ConversationStore,
    InMemoryConversationStore, SqliteConversationStore,
};
use crate::embedding::OpenAiEmbedder;
use crate::knowledge::{
    DocumentStore, InMemoryDocumentStore, KnowledgeError, KnowledgeStore, SqliteDocumentStore,
};
use crate::llm::{LlmClient, OpenAiClient};
use crate::tools::ToolRegistry;

use super::types::*;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub knowledge: KnowledgeStore,
    pub conversations: Arc<dyn ConversationStore>,
    pub llm: Arc<dyn LlmClient>,
    pub tools: Arc<ToolRegistry>,
    pub locks: ConversationLocks,
    pub system_prompt: String,
}

impl AppState {
    /// Wire the stores and tools around already-built provider clients.
    pub fn new(
        config: Config,
        knowledge: KnowledgeStore,
        conversations: Arc<dyn ConversationStore>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let tools = ToolRegistry::for_support(knowledge.clone(), config.agent.search_top_n);
        let system_prompt = build_system_prompt(&config.agent.api_name, &tools);
        Self {
            config,
            knowledge,
            conversations,
            llm,
            tools: Arc::new(tools),
            locks: ConversationLocks::new(),
            system_prompt,
        }
    }

    /// Build the OpenAI clients and pick SQLite or in-memory stores.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let embedder = Arc::new(OpenAiEmbedder::new(&config.embedding, config.api_key.clone())?);
        let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(&config)?);

        let (documents, conversations): (Arc<dyn DocumentStore>, Arc<dyn ConversationStore>) =
            match &config.database_path {
                Some(path) => {
                    tracing::info!("Using SQLite stores at {}", path.display());
                    (
                        Arc::new(SqliteDocumentStore::open(path)?),
                        Arc::new(SqliteConversationStore::open(path)?),
                    )
                }
                None => {
                    tracing::warn!(
                        "DATABASE_PATH not set, docs and conversations are kept in memory"
                    );
                    (
                        Arc::new(InMemoryDocumentStore::new()),
                        Arc::new(InMemoryConversationStore::new()),
                    )
                }
            };

        let knowledge = KnowledgeStore::new(documents, embedder);
        Ok(Self::new(config, knowledge, conversations, llm))
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn start_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartConversationRequest>,
) -> ApiResult<StartConversationResponse> {
    if req.user_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "user_id is required".to_string()));
    }

    let conversation_id = state
        .conversations
        .start(&req.user_id)
        .await
        .map_err(conversation_error)?;
    let conversation = state
        .conversations
        .get(conversation_id)
        .await
        .map_err(conversation_error)?;

    tracing::info!("Started conversation {} for {}", conversation_id, req.user_id);
    Ok(Json(StartConversationResponse {
        conversation_id,
        status: conversation.status,
    }))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<SendMessageResponse> {
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }

    // One interaction at a time per conversation keeps the transcript ordered.
    let _guard = state.locks.acquire(req.conversation_id).await;

    let mut agent = Agent::new(
        state.system_prompt.clone(),
        req.conversation_id,
        Arc::clone(&state.conversations),
        Arc::clone(&state.llm),
        Arc::clone(&state.tools),
        &state.config.agent,
    )
    .await
    .map_err(agent_error)?;

    if agent.conversation().user_id != req.user_id {
        return Err((
            StatusCode::FORBIDDEN,
            "conversation belongs to another user".to_string(),
        ));
    }

    let agent_reply = agent.interact(&req.message).await.map_err(agent_error)?;
    Ok(Json(SendMessageResponse { agent: agent_reply }))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Conversation> {
    state
        .conversations
        .get(id)
        .await
        .map(Json)
        .map_err(conversation_error)
}

pub async fn insert_doc(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsertDocRequest>,
) -> ApiResult<SuccessResponse> {
    if req.name.trim().is_empty() || req.description.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "name and description are required".to_string(),
        ));
    }

    let id = state
        .knowledge
        .insert(req.into())
        .await
        .map_err(knowledge_error)?;
    Ok(Json(SuccessResponse {
        status: true,
        message: "successfully inserted".to_string(),
        id,
    }))
}

pub async fn search_docs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<ApiDocResponse>> {
    let top_n = query.top_n.unwrap_or(state.config.agent.search_top_n);
    let docs = state
        .knowledge
        .search(&query.description_query, top_n)
        .await
        .map_err(knowledge_error)?;
    Ok(Json(docs.into_iter().map(ApiDocResponse::from).collect()))
}

fn agent_error(err: AgentError) -> (StatusCode, String) {
    let status = match &err {
        AgentError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
        AgentError::Provider(_) => StatusCode::BAD_GATEWAY,
        AgentError::Conversation(_) | AgentError::TurnLimitExceeded(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    tracing::error!("Agent interaction failed: {}", err);
    (status, err.to_string())
}

fn conversation_error(err: ConversationError) -> (StatusCode, String) {
    match &err {
        ConversationError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ConversationError::Persistence(_) => {
            tracing::error!("{}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn knowledge_error(err: KnowledgeError) -> (StatusCode, String) {
    let status = match &err {
        KnowledgeError::Embedding(_) => StatusCode::BAD_GATEWAY,
        KnowledgeError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!("Knowledge store failed: {}", err);
    (status, err.to_string())
}
