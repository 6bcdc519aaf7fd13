//! HTTP API for conversations and the documentation knowledge base.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and version
//! - `POST /conversations/start` - Open a conversation for a user
//! - `POST /conversations/send` - Send a message and wait for the agent's reply
//! - `GET /conversations/:id` - Full transcript
//! - `POST /docs/insert` - Embed and store an API documentation entry
//! - `POST /docs/search` - Similarity search over stored entries

mod routes;
pub mod types;

pub use routes::AppState;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Build the router over prepared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/conversations/start", post(routes::start_conversation))
        .route("/conversations/send", post(routes::send_message))
        .route("/conversations/:id", get(routes::get_conversation))
        .route("/docs/insert", post(routes::insert_doc))
        .route("/docs/search", post(routes::search_docs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and serve until it fails.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config)?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
