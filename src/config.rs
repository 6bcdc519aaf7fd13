//! Configuration management for the support agent.
//!
//! Configuration can be set via environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the chat and embedding provider.
//! - `LLM_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. Chat model. Defaults to `gpt-4o-2024-08-06`.
//! - `EMBED_MODEL` - Optional. Embedding model, pinned for both insert and search. Defaults to `text-embedding-3-small`.
//! - `EMBED_BASE_URL` - Optional. Embeddings base URL. Defaults to `LLM_BASE_URL`.
//! - `DATABASE_PATH` - Optional. SQLite file for documents and conversations. In-memory when unset.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `MAX_TURNS` - Optional. Maximum model turns per user message. Defaults to `10`.
//! - `MAX_TOKENS` - Optional. Response token cap per model call. Defaults to `1000`.
//! - `SEARCH_TOP_N` - Optional. Documents returned by the search tool. Defaults to `10`.
//! - `HISTORY_WINDOW` - Optional. Number of stored messages replayed to the model. Unlimited when unset.
//! - `LLM_TIMEOUT_SECS` - Optional. Chat request timeout. Defaults to `60`.
//! - `EMBED_TIMEOUT_SECS` - Optional. Embedding request timeout. Defaults to `30`.
//! - `API_NAME` - Optional. Product named in the system prompt. Defaults to `Crustdata`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::knowledge::DEFAULT_TOP_N;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Embedding provider configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of the OpenAI-compatible embeddings endpoint
    pub base_url: String,

    /// Embedding model, used for documents and queries alike
    pub model: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "text-embedding-3-small".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Agent loop configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum model turns for a single user message
    pub max_turns: usize,

    /// Response token cap for each model call
    pub max_tokens: u32,

    /// Number of documents the search tool returns
    pub search_top_n: usize,

    /// Replay only the last N stored messages (None = whole transcript)
    pub history_window: Option<usize>,

    /// Product the assistant supports, used in the system prompt
    pub api_name: String,
}

impl AgentConfig {
    /// Reject settings that would leave the loop unable to answer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("MAX_TURNS", self.max_turns == 0),
            ("SEARCH_TOP_N", self.search_top_n == 0),
            ("HISTORY_WINDOW", self.history_window == Some(0)),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(ConfigError::InvalidValue(
                name.to_string(),
                "must be at least 1".to_string(),
            )),
            None => Ok(()),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            max_tokens: 1000,
            search_top_n: DEFAULT_TOP_N,
            history_window: None,
            api_name: "Crustdata".to_string(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider API key
    pub api_key: String,

    /// OpenAI-compatible chat base URL
    pub llm_base_url: String,

    /// Chat model identifier
    pub default_model: String,

    /// Chat request timeout
    pub llm_timeout: Duration,

    /// SQLite database file (None = in-memory stores)
    pub database_path: Option<PathBuf>,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Embedding configuration
    pub embedding: EmbeddingConfig,

    /// Agent loop configuration
    pub agent: AgentConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set, and
    /// `ConfigError::InvalidValue` if a numeric variable does not parse or a
    /// turn, result or window limit is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let llm_base_url =
            std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let default_model = std::env::var("DEFAULT_MODEL")
            .unwrap_or_else(|_| "gpt-4o-2024-08-06".to_string());

        let llm_timeout = Duration::from_secs(parse_var("LLM_TIMEOUT_SECS", 60)?);

        let database_path = std::env::var("DATABASE_PATH").ok().map(PathBuf::from);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", 3000)?;

        let embedding_defaults = EmbeddingConfig::default();
        let embedding = EmbeddingConfig {
            base_url: std::env::var("EMBED_BASE_URL").unwrap_or_else(|_| llm_base_url.clone()),
            model: std::env::var("EMBED_MODEL").unwrap_or(embedding_defaults.model),
            timeout: Duration::from_secs(parse_var("EMBED_TIMEOUT_SECS", 30)?),
        };

        let agent_defaults = AgentConfig::default();
        let agent = AgentConfig {
            max_turns: parse_var("MAX_TURNS", agent_defaults.max_turns)?,
            max_tokens: parse_var("MAX_TOKENS", agent_defaults.max_tokens)?,
            search_top_n: parse_var("SEARCH_TOP_N", agent_defaults.search_top_n)?,
            history_window: std::env::var("HISTORY_WINDOW")
                .ok()
                .map(|v| parse_value("HISTORY_WINDOW", &v))
                .transpose()?,
            api_name: std::env::var("API_NAME").unwrap_or(agent_defaults.api_name),
        };

        agent.validate()?;

        Ok(Self {
            api_key,
            llm_base_url,
            default_model,
            llm_timeout,
            database_path,
            host,
            port,
            embedding,
            agent,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            default_model: "gpt-4o-2024-08-06".to_string(),
            llm_timeout: Duration::from_secs(60),
            database_path: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
            embedding: EmbeddingConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => parse_value(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))
}
