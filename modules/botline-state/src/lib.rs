//! Read-modify-write services over the document store.
//!
//! Each service owns one document schema. Mutations read a document with its
//! generation, apply a pure transform and write back conditionally on that
//! generation. A lost race surfaces as `StateError::Conflict`; nothing here
//! retries.

pub mod collection;
pub mod error;
pub mod events;
pub mod groups;
pub mod history;
pub mod profiles;

use std::sync::Arc;

use botline_store::DocumentStore;

pub use collection::{Collection, Versioned};
pub use error::StateError;
pub use events::EventRegistry;
pub use groups::GroupService;
pub use history::HistoryService;
pub use profiles::{MemoryProfileCache, NoProfileCache, ProfileCache, ProfileService};

/// Every state service, sharing one store.
pub struct StateServices {
    pub groups: GroupService,
    pub profiles: ProfileService,
    pub history: HistoryService,
    pub events: EventRegistry,
}

impl StateServices {
    pub fn new(store: Arc<dyn DocumentStore>, profile_cache: Arc<dyn ProfileCache>) -> Self {
        Self {
            groups: GroupService::new(store.clone()),
            profiles: ProfileService::new(store.clone(), profile_cache),
            history: HistoryService::new(store.clone()),
            events: EventRegistry::new(store),
        }
    }
}
