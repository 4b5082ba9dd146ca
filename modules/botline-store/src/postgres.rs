//! Postgres-backed document store.
//!
//! One row per key. The `generation` column is the optimistic lock: every
//! write draws a fresh value from `document_generation_seq` and conditional
//! writes filter on the generation the caller read. A write whose filter
//! matches no row lost the race and surfaces as `StoreError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use crate::store::{DocumentStore, StoreError};
use crate::types::{Document, Generation, Precondition};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::backend(err)
    }
}

// ---------------------------------------------------------------------------
// PgDocumentStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the sequence and table if they do not exist. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE SEQUENCE IF NOT EXISTS document_generation_seq")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                key          TEXT         PRIMARY KEY,
                content_type TEXT         NOT NULL,
                payload      BYTEA        NOT NULL,
                generation   BIGINT       NOT NULL,
                updated_at   TIMESTAMPTZ  NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT generation FROM documents WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    fn conflict(key: &str, expected: Precondition) -> StoreError {
        debug!(key, %expected, "Conditional write rejected");
        StoreError::Conflict {
            key: key.to_string(),
            expected,
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn read(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, (String, Vec<u8>, i64, DateTime<Utc>)>(
            r#"
            SELECT content_type, payload, generation, updated_at
            FROM documents
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(content_type, payload, generation, updated_at)| Document {
            content_type,
            payload,
            generation: Generation::new(generation),
            updated_at,
        }))
    }

    async fn write(
        &self,
        key: &str,
        content_type: &str,
        payload: Vec<u8>,
        precondition: Precondition,
    ) -> Result<Generation, StoreError> {
        let precondition = precondition.normalize();
        let row = match precondition {
            Precondition::DoesNotExist => {
                sqlx::query_as::<_, (i64,)>(
                    r#"
                    INSERT INTO documents (key, content_type, payload, generation)
                    VALUES ($1, $2, $3, nextval('document_generation_seq'))
                    ON CONFLICT (key) DO NOTHING
                    RETURNING generation
                    "#,
                )
                .bind(key)
                .bind(content_type)
                .bind(&payload)
                .fetch_optional(&self.pool)
                .await?
            }
            Precondition::Matches(expected) => {
                sqlx::query_as::<_, (i64,)>(
                    r#"
                    UPDATE documents
                    SET content_type = $2,
                        payload = $3,
                        generation = nextval('document_generation_seq'),
                        updated_at = now()
                    WHERE key = $1 AND generation = $4
                    RETURNING generation
                    "#,
                )
                .bind(key)
                .bind(content_type)
                .bind(&payload)
                .bind(expected.value())
                .fetch_optional(&self.pool)
                .await?
            }
            Precondition::Overwrite => {
                sqlx::query_as::<_, (i64,)>(
                    r#"
                    INSERT INTO documents (key, content_type, payload, generation)
                    VALUES ($1, $2, $3, nextval('document_generation_seq'))
                    ON CONFLICT (key) DO UPDATE
                    SET content_type = EXCLUDED.content_type,
                        payload = EXCLUDED.payload,
                        generation = EXCLUDED.generation,
                        updated_at = now()
                    RETURNING generation
                    "#,
                )
                .bind(key)
                .bind(content_type)
                .bind(&payload)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match row {
            Some((generation,)) => Ok(Generation::new(generation)),
            None => Err(Self::conflict(key, precondition)),
        }
    }

    async fn delete(&self, key: &str, precondition: Precondition) -> Result<(), StoreError> {
        let precondition = precondition.normalize();
        let deleted = match precondition {
            Precondition::DoesNotExist => {
                return if self.exists(key).await? {
                    Err(Self::conflict(key, precondition))
                } else {
                    Ok(())
                };
            }
            Precondition::Matches(expected) => {
                sqlx::query("DELETE FROM documents WHERE key = $1 AND generation = $2")
                    .bind(key)
                    .bind(expected.value())
                    .execute(&self.pool)
                    .await?
                    .rows_affected()
            }
            Precondition::Overwrite => sqlx::query("DELETE FROM documents WHERE key = $1")
                .bind(key)
                .execute(&self.pool)
                .await?
                .rows_affected(),
        };

        if deleted > 0 {
            return Ok(());
        }

        // Nothing deleted: tell a lost race apart from a missing key.
        if matches!(precondition, Precondition::Matches(_)) && self.exists(key).await? {
            Err(Self::conflict(key, precondition))
        } else {
            Err(StoreError::NotFound {
                key: key.to_string(),
            })
        }
    }
}
