//! Test doubles for the provider seams.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::embedding::{Embedder, EmbeddingError};
use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError};
use crate::tools::{Parameter, Tool, ToolArgs};

/// Embedder answering from a fixed text → vector table.
pub struct TableEmbedder {
    model: String,
    table: HashMap<String, Vec<f32>>,
    calls: Arc<AtomicUsize>,
}

impl TableEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            table: HashMap::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::Malformed(format!("no vector for '{}'", text)))
    }
}

/// LLM that replays queued completions and records every request.
#[derive(Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    fallback: Option<Completion>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<Completion, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Answer every call with the same completion.
    pub fn repeating(completion: Completion) -> Self {
        Self {
            fallback: Some(completion),
            ..Self::default()
        }
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().await.push(request.clone());
        match self.script.lock().await.pop_front() {
            Some(next) => next,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string())),
        }
    }
}

/// Tool that records the arguments it was called with.
pub struct RecordingTool {
    name: String,
    parameters: &'static [Parameter],
    fail: bool,
    calls: Mutex<Vec<ToolArgs>>,
}

impl RecordingTool {
    pub fn new(name: &str, parameters: &'static [Parameter]) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, parameters: &'static [Parameter]) -> Self {
        Self {
            fail: true,
            ..Self::new(name, parameters)
        }
    }

    pub async fn calls(&self) -> Vec<ToolArgs> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Records its arguments"
    }

    fn parameters(&self) -> &[Parameter] {
        self.parameters
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("tool exploded");
        }
        self.calls.lock().await.push(args);
        Ok(format!("{} ran", self.name))
    }
}
