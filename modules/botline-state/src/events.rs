//! Scheduled events, at most one per conversation.
//!
//! Only the creator may change or cancel an event. The store knows nothing
//! about identity, so the creator check happens here, between the read and
//! the conditional write. An empty actor id identifies nobody and is refused.

use std::sync::Arc;

use botline_common::{EventPatch, ScheduledEvent};
use botline_store::{DocumentStore, Generation};
use tracing::info;

use crate::collection::Collection;
use crate::error::StateError;

const KIND: &str = "event";

pub struct EventRegistry {
    events: Collection<ScheduledEvent>,
}

fn forbidden(conversation_id: &str, actor_id: &str) -> StateError {
    StateError::Forbidden {
        kind: KIND,
        id: conversation_id.to_string(),
        actor: actor_id.to_string(),
    }
}

impl EventRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            events: Collection::new(store, KIND, "events"),
        }
    }

    pub async fn get(&self, conversation_id: &str) -> Result<ScheduledEvent, StateError> {
        Ok(self.events.get(conversation_id).await?.value)
    }

    /// Fails `Conflict` while another event is active in the conversation.
    pub async fn create(&self, event: &ScheduledEvent) -> Result<Generation, StateError> {
        if event.creator_id.is_empty() {
            return Err(forbidden(&event.conversation_id, &event.creator_id));
        }
        let generation = self.events.create(&event.conversation_id, event).await?;
        info!(
            conversation_id = %event.conversation_id,
            creator_id = %event.creator_id,
            title = %event.title,
            "Event created"
        );
        Ok(generation)
    }

    pub async fn update(
        &self,
        conversation_id: &str,
        actor_id: &str,
        patch: EventPatch,
    ) -> Result<ScheduledEvent, StateError> {
        if actor_id.is_empty() {
            return Err(forbidden(conversation_id, actor_id));
        }
        let updated = self
            .events
            .update(conversation_id, |mut event| {
                if event.creator_id != actor_id {
                    return Err(forbidden(conversation_id, actor_id));
                }
                patch.apply(&mut event);
                Ok(event)
            })
            .await?;
        Ok(updated.value)
    }

    /// Cancel the event. Returns what was deleted.
    pub async fn delete(
        &self,
        conversation_id: &str,
        actor_id: &str,
    ) -> Result<ScheduledEvent, StateError> {
        if actor_id.is_empty() {
            return Err(forbidden(conversation_id, actor_id));
        }
        let current = self.events.get(conversation_id).await?;
        if current.value.creator_id != actor_id {
            return Err(forbidden(conversation_id, actor_id));
        }

        self.events
            .delete(conversation_id, current.generation)
            .await?;

        info!(conversation_id, actor_id, "Event cancelled");
        Ok(current.value)
    }
}
