//! In-memory conversation store (non-persistent).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Conversation, ConversationError, ConversationResult, ConversationStore, Message};

#[derive(Clone)]
pub struct InMemoryConversationStore {
    conversations: Arc<RwLock<HashMap<Uuid, Conversation>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn start(&self, user_id: &str) -> ConversationResult<Uuid> {
        let conversation = Conversation::new(user_id);
        let id = conversation.id;
        self.conversations.write().await.insert(id, conversation);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> ConversationResult<Conversation> {
        self.conversations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ConversationError::NotFound(id))
    }

    async fn append_message(&self, id: Uuid, message: Message) -> ConversationResult<()> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(&id)
            .ok_or(ConversationError::NotFound(id))?;
        conversation.messages.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationStatus, MessageRole};

    #[tokio::test]
    async fn start_then_get_returns_empty_transcript() {
        let store = InMemoryConversationStore::new();
        let id = store.start("user-1").await.expect("start conversation");

        let conversation = store.get(id).await.expect("conversation exists");
        assert_eq!(conversation.user_id, "user-1");
        assert_eq!(conversation.status, ConversationStatus::Started);
        assert!(conversation.messages.is_empty());
    }

    #[tokio::test]
    async fn append_keeps_insertion_order() {
        let store = InMemoryConversationStore::new();
        let id = store.start("user-1").await.expect("start conversation");

        store.append_message(id, Message::user("first")).await.unwrap();
        store.append_message(id, Message::assistant("second")).await.unwrap();

        let messages = store.get(id).await.unwrap().messages;
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert_eq!(messages[1].content, "second");
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let store = InMemoryConversationStore::new();
        let missing = Uuid::new_v4();

        assert!(matches!(
            store.get(missing).await,
            Err(ConversationError::NotFound(id)) if id == missing
        ));
        assert!(matches!(
            store.append_message(missing, Message::user("hi")).await,
            Err(ConversationError::NotFound(_))
        ));
    }
}
