use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Group membership ---

/// Membership record for a group chat, keyed by group ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default)]
    pub bot_joined: bool,
}

impl Group {
    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            bot_joined: false,
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }
}

// --- Profile summaries ---

/// Display information for a group or user, as last fetched from the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub display_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub member_count: Option<u32>,
}

// --- Conversation history ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl MessageEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Every message exchanged in one conversation, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    #[serde(default)]
    pub messages: Vec<MessageEntry>,
}

impl ConversationHistory {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// --- Scheduled events ---

/// The single active event of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub conversation_id: String,
    pub creator_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update applied by the event creator. `None` fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl EventPatch {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: Some(description.into()),
        }
    }

    pub fn apply(self, event: &mut ScheduledEvent) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_round_trips() {
        let group = Group::default();
        let json = serde_json::to_vec(&group).unwrap();
        let back: Group = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, group);
        assert!(back.members.is_empty());
    }

    #[test]
    fn group_serializes_camel_case_and_sorted_members() {
        let mut group = Group::with_members(["bob", "alice"]);
        group.bot_joined = true;
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["botJoined"], true);
        assert_eq!(json["members"], serde_json::json!(["alice", "bob"]));
    }

    #[test]
    fn empty_history_round_trips() {
        let history = ConversationHistory::default();
        let json = serde_json::to_vec(&history).unwrap();
        let back: ConversationHistory = serde_json::from_slice(&json).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn history_keeps_entry_order() {
        let history = ConversationHistory {
            messages: vec![
                MessageEntry::user("hi"),
                MessageEntry::assistant("hello"),
                MessageEntry::user("bye"),
            ],
        };
        let json = serde_json::to_vec(&history).unwrap();
        let back: ConversationHistory = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, history);
        assert_eq!(back.messages[1].role, Role::Assistant);
    }

    #[test]
    fn profile_and_event_round_trip() {
        let profile = ProfileSummary {
            display_name: "Hiking club".into(),
            picture_url: None,
            member_count: Some(12),
        };
        let json = serde_json::to_vec(&profile).unwrap();
        assert_eq!(serde_json::from_slice::<ProfileSummary>(&json).unwrap(), profile);

        let event = ScheduledEvent {
            conversation_id: "c1".into(),
            creator_id: "alice".into(),
            title: "Picnic".into(),
            description: String::new(),
        };
        let json = serde_json::to_vec(&event).unwrap();
        assert_eq!(serde_json::from_slice::<ScheduledEvent>(&json).unwrap(), event);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut event = ScheduledEvent {
            conversation_id: "c1".into(),
            creator_id: "alice".into(),
            title: "Picnic".into(),
            description: "Saturday".into(),
        };
        EventPatch::description("Sunday").apply(&mut event);
        assert_eq!(event.title, "Picnic");
        assert_eq!(event.description, "Sunday");
    }
}
