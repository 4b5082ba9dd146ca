use std::sync::Arc;

use botline_common::{ConversationHistory, MessageEntry};
use botline_store::DocumentStore;

use crate::collection::{Collection, Versioned};
use crate::error::StateError;

/// Per-conversation message log. Every append rewrites the whole sequence;
/// there is no trimming.
pub struct HistoryService {
    history: Collection<ConversationHistory>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            history: Collection::new(store, "history", "history"),
        }
    }

    pub async fn get(&self, conversation_id: &str) -> Result<ConversationHistory, StateError> {
        Ok(self.history.get(conversation_id).await?.value)
    }

    /// Empty history for conversations that have no document yet.
    pub async fn get_or_empty(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationHistory, StateError> {
        Ok(self
            .history
            .load(conversation_id)
            .await?
            .map(|v| v.value)
            .unwrap_or_default())
    }

    pub async fn append(
        &self,
        conversation_id: &str,
        entry: MessageEntry,
    ) -> Result<Versioned<ConversationHistory>, StateError> {
        self.history
            .mutate(conversation_id, |current| {
                let mut history = current.unwrap_or_default();
                history.messages.push(entry);
                Ok(history)
            })
            .await
    }

    /// Delete the conversation's history. Returns `false` if there was none.
    pub async fn reset(&self, conversation_id: &str) -> Result<bool, StateError> {
        let Some(current) = self.history.load(conversation_id).await? else {
            return Ok(false);
        };
        self.history
            .delete(conversation_id, current.generation)
            .await?;
        Ok(true)
    }
}
