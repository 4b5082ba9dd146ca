//! Versioned document store with conditional writes.
//!
//! Every key holds one opaque payload and a store-assigned generation. Writes
//! name the generation they expect to replace; a stale expectation is rejected
//! with `StoreError::Conflict` and leaves the stored document untouched. This
//! compare-and-swap is the only concurrency control the bot relies on.

pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::{DocumentStore, StoreError};
pub use types::{Document, Generation, Precondition};
