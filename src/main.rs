//! Support Agent - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes conversations and the docs store.

use support_agent::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, embedding model={}, persistent={}",
        config.default_model,
        config.embedding.model,
        config.database_path.is_some()
    );

    api::serve(config).await?;

    Ok(())
}
