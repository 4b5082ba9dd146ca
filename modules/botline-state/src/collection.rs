//! Typed JSON documents over a `DocumentStore`.
//!
//! `Collection<T>` is the read-modify-write protocol every state service is
//! built on: read a document and its generation, transform it, write it back
//! conditionally on the generation just read.

use std::marker::PhantomData;
use std::sync::Arc;

use botline_store::{DocumentStore, Generation, Precondition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StateError;

const CONTENT_TYPE_JSON: &str = "application/json";

/// A decoded document plus the generation it was read at (or written as).
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub generation: Generation,
}

pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    kind: &'static str,
    prefix: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// `kind` names the entity in errors and logs; documents live at `{prefix}/{id}.json`.
    pub fn new(store: Arc<dyn DocumentStore>, kind: &'static str, prefix: &'static str) -> Self {
        Self {
            store,
            kind,
            prefix,
            _marker: PhantomData,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn key(&self, id: &str) -> String {
        format!("{}/{}.json", self.prefix, id)
    }

    /// Read and decode. `Ok(None)` when the document does not exist.
    pub async fn load(&self, id: &str) -> Result<Option<Versioned<T>>, StateError> {
        let doc = self
            .store
            .read(&self.key(id))
            .await
            .map_err(|e| StateError::from_store(self.kind, id, e))?;

        let Some(doc) = doc else {
            return Ok(None);
        };

        let value = serde_json::from_slice(&doc.payload).map_err(|source| StateError::Decode {
            kind: self.kind,
            id: id.to_string(),
            source,
        })?;

        Ok(Some(Versioned {
            value,
            generation: doc.generation,
        }))
    }

    /// Read and decode, failing `NotFound` when absent.
    pub async fn get(&self, id: &str) -> Result<Versioned<T>, StateError> {
        self.load(id)
            .await?
            .ok_or_else(|| StateError::not_found(self.kind, id))
    }

    /// Create-only write. Fails `Conflict` if the document already exists.
    pub async fn create(&self, id: &str, value: &T) -> Result<Generation, StateError> {
        self.put(id, value, Precondition::DoesNotExist).await
    }

    /// Unconditional write, for idempotent seed data only.
    pub async fn seed(&self, id: &str, value: &T) -> Result<Generation, StateError> {
        self.put(id, value, Precondition::Overwrite).await
    }

    /// Read, transform, write back at the generation just read.
    ///
    /// The transform sees `None` when the document does not exist yet; its
    /// result is then written create-only. An `Err` from the transform aborts
    /// before any write is attempted.
    pub async fn mutate<F>(&self, id: &str, transform: F) -> Result<Versioned<T>, StateError>
    where
        F: FnOnce(Option<T>) -> Result<T, StateError> + Send,
    {
        let current = self.load(id).await?;
        let read_at = current
            .as_ref()
            .map(|v| v.generation)
            .unwrap_or(Generation::ABSENT);

        let value = transform(current.map(|v| v.value))?;

        let generation = match self.put(id, &value, Precondition::from_read(read_at)).await {
            Ok(generation) => generation,
            Err(e) => {
                if e.is_conflict() {
                    warn!(kind = self.kind, id, read_at = %read_at, "Lost write race");
                }
                return Err(e);
            }
        };

        debug!(kind = self.kind, id, from = %read_at, to = %generation, "Document updated");
        Ok(Versioned { value, generation })
    }

    /// Like `mutate`, but the document must already exist.
    pub async fn update<F>(&self, id: &str, transform: F) -> Result<Versioned<T>, StateError>
    where
        F: FnOnce(T) -> Result<T, StateError> + Send,
    {
        let kind = self.kind;
        self.mutate(id, move |current| match current {
            Some(value) => transform(value),
            None => Err(StateError::not_found(kind, id)),
        })
        .await
    }

    /// Remove the document if it is still at `generation`.
    pub async fn delete(&self, id: &str, generation: Generation) -> Result<(), StateError> {
        self.store
            .delete(&self.key(id), Precondition::from_read(generation))
            .await
            .map_err(|e| StateError::from_store(self.kind, id, e))
    }

    async fn put(
        &self,
        id: &str,
        value: &T,
        precondition: Precondition,
    ) -> Result<Generation, StateError> {
        let payload = serde_json::to_vec(value).map_err(|source| StateError::Decode {
            kind: self.kind,
            id: id.to_string(),
            source,
        })?;

        self.store
            .write(&self.key(id), CONTENT_TYPE_JSON, payload, precondition)
            .await
            .map_err(|e| StateError::from_store(self.kind, id, e))
    }
}
