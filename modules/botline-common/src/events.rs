//! Wire-format-independent events handed to application handlers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened. Closed set: handlers match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// The bot was added to a group or room.
    Join,
    /// The bot was removed from a group or room.
    Leave,
    Follow,
    Unfollow,
    MemberJoined { user_ids: Vec<String> },
    MemberLeft { user_ids: Vec<String> },
    Text { text: String },
    Image { message_id: String },
    Sticker { package_id: String, sticker_id: String },
    Postback { data: String },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Join => "join",
            EventKind::Leave => "leave",
            EventKind::Follow => "follow",
            EventKind::Unfollow => "unfollow",
            EventKind::MemberJoined { .. } => "member_joined",
            EventKind::MemberLeft { .. } => "member_left",
            EventKind::Text { .. } => "text",
            EventKind::Image { .. } => "image",
            EventKind::Sticker { .. } => "sticker",
            EventKind::Postback { .. } => "postback",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One inbound platform event after parsing and normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Single-use token for answering this event. Absent for kinds that cannot be replied to.
    pub reply_token: Option<String>,
    /// Group ID, room ID, or user ID for one-to-one chats.
    pub conversation_id: String,
    pub actor_id: Option<String>,
    pub kind: EventKind,
}

impl NormalizedEvent {
    pub fn new(conversation_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            reply_token: None,
            conversation_id: conversation_id.into(),
            actor_id: None,
            kind,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_reply_token(mut self, reply_token: impl Into<String>) -> Self {
        self.reply_token = Some(reply_token.into());
        self
    }

    /// Message text, for text events.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn actor(&self) -> &str {
        self.actor_id.as_deref().unwrap_or("")
    }
}
