//! Profile summaries with a process-local read-through cache.
//!
//! The store is authoritative. The cache is filled on read misses and after
//! confirmed writes, never before, so a failed persist cannot leave a value
//! in the cache that was never stored.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use botline_common::ProfileSummary;
use botline_store::{DocumentStore, Generation};
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::error::StateError;

/// Process-local profile cache. Swappable so it can be disabled or isolated.
///
/// Entries carry the generation they were read or written at. `put` never
/// replaces an entry with an older generation, so a slow read-through cannot
/// undo a newer confirmed write.
pub trait ProfileCache: Send + Sync {
    fn get(&self, id: &str) -> Option<ProfileSummary>;
    fn put(&self, id: &str, profile: ProfileSummary, generation: Generation);
    fn invalidate(&self, id: &str);
}

#[derive(Default)]
pub struct MemoryProfileCache {
    entries: RwLock<HashMap<String, (Generation, ProfileSummary)>>,
}

impl MemoryProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generation of the cached entry, if any.
    pub fn generation(&self, id: &str) -> Option<Generation> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|(generation, _)| *generation)
    }
}

impl ProfileCache for MemoryProfileCache {
    fn get(&self, id: &str) -> Option<ProfileSummary> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|(_, profile)| profile.clone())
    }

    fn put(&self, id: &str, profile: ProfileSummary, generation: Generation) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let newer_cached = matches!(entries.get(id), Some((cached, _)) if *cached > generation);
        if newer_cached {
            debug!(id, stale = %generation, "Ignoring older profile");
            return;
        }
        entries.insert(id.to_string(), (generation, profile));
    }

    fn invalidate(&self, id: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

/// Cache that never holds anything; every read goes to the store.
pub struct NoProfileCache;

impl ProfileCache for NoProfileCache {
    fn get(&self, _id: &str) -> Option<ProfileSummary> {
        None
    }

    fn put(&self, _id: &str, _profile: ProfileSummary, _generation: Generation) {}

    fn invalidate(&self, _id: &str) {}
}

pub struct ProfileService {
    profiles: Collection<ProfileSummary>,
    cache: Arc<dyn ProfileCache>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<dyn ProfileCache>) -> Self {
        Self {
            profiles: Collection::new(store, "profile", "profiles"),
            cache,
        }
    }

    pub async fn get(&self, id: &str) -> Result<ProfileSummary, StateError> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }

        let stored = self.profiles.get(id).await?;
        debug!(id, "Profile cache miss, populated from store");
        self.cache.put(id, stored.value.clone(), stored.generation);
        Ok(stored.value)
    }

    /// Persist first, then cache. On failure the cached entry is dropped.
    pub async fn set(&self, id: &str, profile: ProfileSummary) -> Result<Generation, StateError> {
        let written = self.profiles.mutate(id, |_| Ok(profile)).await;

        match written {
            Ok(stored) => {
                self.cache.put(id, stored.value, stored.generation);
                Ok(stored.generation)
            }
            Err(e) => {
                warn!(id, error = %e, "Profile write failed, dropping cached entry");
                self.cache.invalidate(id);
                Err(e)
            }
        }
    }

    pub fn invalidate(&self, id: &str) {
        self.cache.invalidate(id);
    }
}
