//! Core agent loop implementation.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::conversation::{Conversation, ConversationError, ConversationStore, Message};
use crate::llm::{CompletionRequest, LlmClient, LlmError, ToolCall};
use crate::tools::ToolRegistry;

use super::context::build_messages;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("Conversation storage failed: {0}")]
    Conversation(ConversationError),

    #[error("LLM provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("No reply for the user after {0} model turns")]
    TurnLimitExceeded(usize),
}

impl From<ConversationError> for AgentError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::NotFound(id) => Self::ConversationNotFound(id),
            other => Self::Conversation(other),
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Where the loop is between model turns.
enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done(String),
}

/// Support agent bound to one conversation.
pub struct Agent {
    system_prompt: String,
    conversation: Conversation,
    conversations: Arc<dyn ConversationStore>,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    max_turns: usize,
    history_window: Option<usize>,
}

impl Agent {
    /// Load conversation `conversation_id` and bind an agent to it.
    pub async fn new(
        system_prompt: impl Into<String>,
        conversation_id: Uuid,
        conversations: Arc<dyn ConversationStore>,
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> AgentResult<Self> {
        let conversation = conversations.get(conversation_id).await?;
        Ok(Self {
            system_prompt: system_prompt.into(),
            conversation,
            conversations,
            llm,
            tools,
            max_turns: config.max_turns,
            history_window: config.history_window,
        })
    }

    /// The conversation as this agent last saw it.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Handle one user message and return the reply meant for the user.
    pub async fn interact(&mut self, user_input: &str) -> AgentResult<String> {
        self.append(Message::user(user_input)).await?;

        let mut turns = 0;
        let mut state = LoopState::AwaitingModel;
        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if turns == self.max_turns {
                        tracing::warn!(
                            "Conversation {} hit the turn limit ({})",
                            self.conversation.id,
                            self.max_turns
                        );
                        return Err(AgentError::TurnLimitExceeded(turns));
                    }
                    turns += 1;
                    tracing::debug!("Agent turn {} for {}", turns, self.conversation.id);
                    self.next_model_turn().await?
                }
                LoopState::ExecutingTools(calls) => {
                    self.execute_tool_calls(calls).await?;
                    LoopState::AwaitingModel
                }
                LoopState::Done(content) => return Ok(content),
            };
        }
    }

    async fn next_model_turn(&mut self) -> AgentResult<LoopState> {
        let request = CompletionRequest {
            messages: build_messages(
                &self.system_prompt,
                &self.conversation.messages,
                self.history_window,
            ),
            tools: self.tools.get_tool_schemas(),
        };

        let completion = self.llm.complete(&request).await?;
        if !completion.tool_calls.is_empty() {
            return Ok(LoopState::ExecutingTools(completion.tool_calls));
        }

        let reply = completion.reply.ok_or_else(|| {
            LlmError::InvalidResponse(
                "completion carried neither content nor tool calls".to_string(),
            )
        })?;
        self.append(Message::assistant(reply.content.clone())).await?;

        if reply.show_to_user {
            Ok(LoopState::Done(reply.content))
        } else {
            tracing::debug!("Internal processing: {}", truncate_for_log(&reply.content, 200));
            Ok(LoopState::AwaitingModel)
        }
    }

    async fn execute_tool_calls(&mut self, calls: Vec<ToolCall>) -> AgentResult<()> {
        for call in calls {
            tracing::debug!(
                "Calling tool: {} with args: {}",
                call.function.name,
                call.function.arguments
            );
            let result = self
                .tools
                .execute(&call.function.name, &call.function.arguments)
                .await;
            tracing::debug!("Tool result: {}", truncate_for_log(&result, 1000));

            let content = format!("Tool result for {}: {}", call.function.arguments, result);
            self.append(Message::tool(
                call.function.name,
                call.id,
                call.function.arguments,
                content,
            ))
            .await?;
        }
        Ok(())
    }

    /// Persist first, then mirror locally so both copies agree on order.
    async fn append(&mut self, message: Message) -> AgentResult<()> {
        self.conversations
            .append_message(self.conversation.id, message.clone())
            .await?;
        self.conversation.messages.push(message);
        Ok(())
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
