use std::sync::Arc;

use botline_common::Group;
use botline_store::{DocumentStore, Generation};
use tracing::info;

use crate::collection::{Collection, Versioned};
use crate::error::StateError;

/// Group membership, keyed by group ID.
///
/// Membership and bot-presence changes are checked against the document as
/// read; a change that would be a no-op fails before any write is attempted.
pub struct GroupService {
    groups: Collection<Group>,
}

impl GroupService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            groups: Collection::new(store, "group", "groups"),
        }
    }

    pub async fn get(&self, group_id: &str) -> Result<Group, StateError> {
        Ok(self.groups.get(group_id).await?.value)
    }

    pub async fn load(&self, group_id: &str) -> Result<Option<Versioned<Group>>, StateError> {
        self.groups.load(group_id).await
    }

    /// Create a group with its initial members. Fails `Conflict` if it exists.
    pub async fn create<I, S>(&self, group_id: &str, members: I) -> Result<Generation, StateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .create(group_id, &Group::with_members(members))
            .await
    }

    /// Add a user, creating the group on first sight.
    pub async fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Versioned<Group>, StateError> {
        self.groups
            .mutate(group_id, |current| {
                let mut group = current.unwrap_or_default();
                if !group.members.insert(user_id.to_string()) {
                    return Err(StateError::AlreadyMember {
                        group_id: group_id.to_string(),
                        user_id: user_id.to_string(),
                    });
                }
                Ok(group)
            })
            .await
    }

    pub async fn remove_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Versioned<Group>, StateError> {
        self.groups
            .update(group_id, |mut group| {
                if !group.members.remove(user_id) {
                    return Err(StateError::NotMember {
                        group_id: group_id.to_string(),
                        user_id: user_id.to_string(),
                    });
                }
                Ok(group)
            })
            .await
    }

    /// Record that the bot joined. Fails `AlreadyInGroup` if it already had.
    pub async fn add_bot(&self, group_id: &str) -> Result<Versioned<Group>, StateError> {
        let joined = self
            .groups
            .mutate(group_id, |current| {
                let mut group = current.unwrap_or_default();
                if group.bot_joined {
                    return Err(StateError::AlreadyInGroup {
                        group_id: group_id.to_string(),
                    });
                }
                group.bot_joined = true;
                Ok(group)
            })
            .await?;

        info!(group_id, generation = %joined.generation, "Bot joined group");
        Ok(joined)
    }

    pub async fn remove_bot(&self, group_id: &str) -> Result<Versioned<Group>, StateError> {
        let left = self
            .groups
            .update(group_id, |mut group| {
                if !group.bot_joined {
                    return Err(StateError::NotInGroup {
                        group_id: group_id.to_string(),
                    });
                }
                group.bot_joined = false;
                Ok(group)
            })
            .await?;

        info!(group_id, generation = %left.generation, "Bot left group");
        Ok(left)
    }

    /// `false` for unknown groups.
    pub async fn is_member(&self, group_id: &str, user_id: &str) -> Result<bool, StateError> {
        Ok(self
            .groups
            .load(group_id)
            .await?
            .is_some_and(|g| g.value.has_member(user_id)))
    }
}
