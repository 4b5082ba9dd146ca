//! Core types for the document store. Domain-agnostic.

use std::fmt;

use chrono::{DateTime, Utc};

/// Store-assigned version of a document.
///
/// Generation 0 means the key has never been written (or no longer exists).
/// Every successful write returns a strictly greater generation than any the
/// store handed out before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(i64);

impl Generation {
    pub const ABSENT: Generation = Generation(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_absent(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a write or delete expects to find at the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Create-only: the key must not exist.
    DoesNotExist,
    /// The current generation must equal this one. Build it with
    /// `from_read`; `Matches(Generation::ABSENT)` is treated as `DoesNotExist`.
    Matches(Generation),
    /// No check. Reserved for idempotent seed writes.
    Overwrite,
}

impl Precondition {
    /// The precondition for writing back a document read at `generation`.
    /// An absent read (generation 0) becomes a create-only write.
    pub fn from_read(generation: Generation) -> Self {
        if generation.is_absent() {
            Precondition::DoesNotExist
        } else {
            Precondition::Matches(generation)
        }
    }
}

impl Precondition {
    /// Generation 0 is how an absent key reads, so matching it means the key
    /// must not exist. Backends apply this before checking.
    pub fn normalize(self) -> Self {
        match self {
            Precondition::Matches(generation) if generation.is_absent() => {
                Precondition::DoesNotExist
            }
            other => other,
        }
    }
}

impl From<Generation> for Precondition {
    fn from(generation: Generation) -> Self {
        Precondition::from_read(generation)
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::DoesNotExist => write!(f, "does-not-exist"),
            Precondition::Matches(g) => write!(f, "generation={g}"),
            Precondition::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content_type: String,
    pub payload: Vec<u8>,
    pub generation: Generation,
    pub updated_at: DateTime<Utc>,
}
