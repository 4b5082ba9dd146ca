use botline_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} was modified concurrently")]
    Conflict { kind: &'static str, id: String },

    #[error("{actor} may not modify {kind} {id}")]
    Forbidden {
        kind: &'static str,
        id: String,
        actor: String,
    },

    #[error("malformed {kind} document {id}: {source}")]
    Decode {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Backend(StoreError),

    #[error("{user_id} is already a member of {group_id}")]
    AlreadyMember { group_id: String, user_id: String },

    #[error("{user_id} is not a member of {group_id}")]
    NotMember { group_id: String, user_id: String },

    #[error("bot already joined {group_id}")]
    AlreadyInGroup { group_id: String },

    #[error("bot is not in {group_id}")]
    NotInGroup { group_id: String },
}

impl StateError {
    /// Attach the entity kind and id to a store failure.
    pub(crate) fn from_store(kind: &'static str, id: &str, err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => StateError::Conflict {
                kind,
                id: id.to_string(),
            },
            StoreError::NotFound { .. } => StateError::NotFound {
                kind,
                id: id.to_string(),
            },
            other => StateError::Backend(other),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        StateError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StateError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound { .. })
    }
}
