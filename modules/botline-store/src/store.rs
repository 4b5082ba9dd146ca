//! The storage contract every backend implements.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Document, Generation, Precondition};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The precondition did not hold: a concurrent writer got there first.
    #[error("precondition failed for {key} ({expected})")]
    Conflict { key: String, expected: Precondition },

    /// Only produced by deletes; reads report absence as `None`.
    #[error("no document at {key}")]
    NotFound { key: String },

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Key → (payload, generation) with per-key conditional writes.
///
/// Implemented by `MemoryDocumentStore` (tests, local runs) and
/// `PgDocumentStore` (production). Nothing here retries; callers decide what
/// to do with a `Conflict`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current document. `Ok(None)` when the key has never been written.
    async fn read(&self, key: &str) -> Result<Option<Document>, StoreError>;

    /// Atomically replace the document at `key` if `precondition` holds.
    /// Returns the new generation.
    async fn write(
        &self,
        key: &str,
        content_type: &str,
        payload: Vec<u8>,
        precondition: Precondition,
    ) -> Result<Generation, StoreError>;

    /// Remove the key if `precondition` holds. `DoesNotExist` is a no-op on an
    /// absent key and a `Conflict` on a present one.
    async fn delete(&self, key: &str, precondition: Precondition) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn read(&self, key: &str) -> Result<Option<Document>, StoreError> {
        (**self).read(key).await
    }

    async fn write(
        &self,
        key: &str,
        content_type: &str,
        payload: Vec<u8>,
        precondition: Precondition,
    ) -> Result<Generation, StoreError> {
        (**self).write(key, content_type, payload, precondition).await
    }

    async fn delete(&self, key: &str, precondition: Precondition) -> Result<(), StoreError> {
        (**self).delete(key, precondition).await
    }
}
