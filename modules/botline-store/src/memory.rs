//! In-memory document store. Same conditional-write contract as Postgres,
//! no database required.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::store::{DocumentStore, StoreError};
use crate::types::{Document, Generation, Precondition};

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Document>,
    last_generation: i64,
}

/// Mutex-guarded map of documents. Thread-safe; every operation holds the
/// lock for its whole check-and-apply so writes are atomic per key.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored (for test assertions).
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().documents.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a half-applied write:
        // documents are only ever inserted whole.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check(
    key: &str,
    current: Option<&Document>,
    precondition: Precondition,
) -> Result<(), StoreError> {
    let holds = match (precondition, current) {
        (Precondition::Overwrite, _) => true,
        (Precondition::DoesNotExist, None) => true,
        (Precondition::DoesNotExist, Some(_)) => false,
        (Precondition::Matches(expected), Some(doc)) => doc.generation == expected,
        (Precondition::Matches(_), None) => false,
    };

    if holds {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            key: key.to_string(),
            expected: precondition,
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.lock().documents.get(key).cloned())
    }

    async fn write(
        &self,
        key: &str,
        content_type: &str,
        payload: Vec<u8>,
        precondition: Precondition,
    ) -> Result<Generation, StoreError> {
        let precondition = precondition.normalize();
        let mut inner = self.lock();
        check(key, inner.documents.get(key), precondition)?;

        inner.last_generation += 1;
        let generation = Generation::new(inner.last_generation);
        inner.documents.insert(
            key.to_string(),
            Document {
                content_type: content_type.to_string(),
                payload,
                generation,
                updated_at: Utc::now(),
            },
        );

        Ok(generation)
    }

    async fn delete(&self, key: &str, precondition: Precondition) -> Result<(), StoreError> {
        let precondition = precondition.normalize();
        let mut inner = self.lock();
        let current = inner.documents.get(key);

        if current.is_none() {
            return match precondition {
                Precondition::DoesNotExist => Ok(()),
                _ => Err(StoreError::NotFound {
                    key: key.to_string(),
                }),
            };
        }

        check(key, current, precondition)?;
        inner.documents.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = "application/json";

    #[tokio::test]
    async fn absent_key_reads_as_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.read("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generations_never_repeat_after_delete() {
        let store = MemoryDocumentStore::new();

        let first = store
            .write("k", JSON, b"1".to_vec(), Precondition::DoesNotExist)
            .await
            .unwrap();
        store.delete("k", Precondition::Matches(first)).await.unwrap();
        let second = store
            .write("k", JSON, b"2".to_vec(), Precondition::DoesNotExist)
            .await
            .unwrap();

        assert!(second > first);
        let err = store
            .write("k", JSON, b"3".to_vec(), Precondition::Matches(first))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn delete_absent_key() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            store.delete("k", Precondition::Overwrite).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.delete("k", Precondition::DoesNotExist).await.is_ok());
    }

    #[tokio::test]
    async fn delete_with_stale_generation_conflicts() {
        let store = MemoryDocumentStore::new();
        let g1 = store
            .write("k", JSON, b"a".to_vec(), Precondition::DoesNotExist)
            .await
            .unwrap();
        store
            .write("k", JSON, b"b".to_vec(), Precondition::Matches(g1))
            .await
            .unwrap();

        let err = store.delete("k", Precondition::Matches(g1)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.len(), 1);
    }
}
