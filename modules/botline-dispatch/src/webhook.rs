//! LINE webhook wire format and its normalization.

use botline_common::{EventKind, NormalizedEvent};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::DispatchError;

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: String,
    pub events: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Source {
    User {
        user_id: String,
    },
    Group {
        group_id: String,
        user_id: Option<String>,
    },
    Room {
        room_id: String,
        user_id: Option<String>,
    },
}

impl Source {
    /// Where replies go: the group, the room, or the user for 1:1 chats.
    pub fn conversation_id(&self) -> &str {
        match self {
            Source::User { user_id } => user_id,
            Source::Group { group_id, .. } => group_id,
            Source::Room { room_id, .. } => room_id,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Source::User { user_id } => Some(user_id),
            Source::Group { user_id, .. } | Source::Room { user_id, .. } => user_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Members {
    #[serde(default)]
    pub members: Vec<Source>,
}

impl Members {
    fn user_ids(&self) -> Vec<String> {
        self.members
            .iter()
            .filter_map(|m| m.user_id().map(str::to_string))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WireMessage {
    Text {
        id: String,
        text: String,
    },
    Image {
        id: String,
    },
    Sticker {
        id: String,
        package_id: String,
        sticker_id: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WireEvent {
    Message {
        reply_token: Option<String>,
        source: Source,
        message: WireMessage,
    },
    Join {
        reply_token: Option<String>,
        source: Source,
    },
    Leave {
        source: Source,
    },
    Follow {
        reply_token: Option<String>,
        source: Source,
    },
    Unfollow {
        source: Source,
    },
    MemberJoined {
        reply_token: Option<String>,
        source: Source,
        joined: Members,
    },
    MemberLeft {
        source: Source,
        left: Members,
    },
    Postback {
        reply_token: Option<String>,
        source: Source,
        postback: Postback,
    },
    #[serde(other)]
    Unsupported,
}

/// Map a wire event to the handler-facing form. `None` for events the bot
/// does not act on.
pub fn normalize(event: WireEvent) -> Option<NormalizedEvent> {
    let (reply_token, source, kind) = match event {
        WireEvent::Message {
            reply_token,
            source,
            message,
        } => {
            let kind = match message {
                WireMessage::Text { text, .. } => EventKind::Text { text },
                WireMessage::Image { id } => EventKind::Image { message_id: id },
                WireMessage::Sticker {
                    package_id,
                    sticker_id,
                    ..
                } => EventKind::Sticker {
                    package_id,
                    sticker_id,
                },
                WireMessage::Unsupported => return None,
            };
            (reply_token, source, kind)
        }
        WireEvent::Join {
            reply_token,
            source,
        } => (reply_token, source, EventKind::Join),
        WireEvent::Leave { source } => (None, source, EventKind::Leave),
        WireEvent::Follow {
            reply_token,
            source,
        } => (reply_token, source, EventKind::Follow),
        WireEvent::Unfollow { source } => (None, source, EventKind::Unfollow),
        WireEvent::MemberJoined {
            reply_token,
            source,
            joined,
        } => (
            reply_token,
            source,
            EventKind::MemberJoined {
                user_ids: joined.user_ids(),
            },
        ),
        WireEvent::MemberLeft { source, left } => (
            None,
            source,
            EventKind::MemberLeft {
                user_ids: left.user_ids(),
            },
        ),
        WireEvent::Postback {
            reply_token,
            source,
            postback,
        } => (
            reply_token,
            source,
            EventKind::Postback {
                data: postback.data,
            },
        ),
        WireEvent::Unsupported => return None,
    };

    Some(NormalizedEvent {
        reply_token,
        conversation_id: source.conversation_id().to_string(),
        actor_id: source.user_id().map(str::to_string),
        kind,
    })
}

/// Parse a delivery body into normalized events.
///
/// The body itself must be valid JSON with an `events` array. Individual
/// events that fail to decode or carry no business meaning are skipped.
pub fn parse(body: &[u8]) -> Result<Vec<NormalizedEvent>, DispatchError> {
    let body: WebhookBody = serde_json::from_slice(body).map_err(DispatchError::MalformedBody)?;
    let total = body.events.len();

    let events: Vec<NormalizedEvent> = body
        .events
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<WireEvent>(raw) {
            Ok(event) => normalize(event),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable webhook event");
                None
            }
        })
        .collect();

    debug!(
        destination = %body.destination,
        total,
        relevant = events.len(),
        "Webhook parsed"
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(events: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({ "destination": "Ubot", "events": events })).unwrap()
    }

    #[test]
    fn text_message_in_group() {
        let events = parse(&body(json!([{
            "type": "message",
            "replyToken": "rt-1",
            "timestamp": 1700000000000_i64,
            "source": { "type": "group", "groupId": "Cgroup", "userId": "Ualice" },
            "message": { "type": "text", "id": "m1", "text": "hello" }
        }])))
        .unwrap();

        assert_eq!(
            events,
            vec![NormalizedEvent::new("Cgroup", EventKind::Text { text: "hello".into() })
                .with_actor("Ualice")
                .with_reply_token("rt-1")]
        );
        assert_eq!(events[0].text(), Some("hello"));
    }

    #[test]
    fn one_to_one_chat_uses_user_as_conversation() {
        let events = parse(&body(json!([{
            "type": "follow",
            "replyToken": "rt-2",
            "source": { "type": "user", "userId": "Ubob" }
        }])))
        .unwrap();

        assert_eq!(events[0].conversation_id, "Ubob");
        assert_eq!(events[0].actor_id.as_deref(), Some("Ubob"));
        assert_eq!(events[0].kind, EventKind::Follow);
    }

    #[test]
    fn membership_events_carry_all_users() {
        let events = parse(&body(json!([
            {
                "type": "memberJoined",
                "replyToken": "rt-3",
                "source": { "type": "group", "groupId": "Cg" },
                "joined": { "members": [
                    { "type": "user", "userId": "U1" },
                    { "type": "user", "userId": "U2" }
                ]}
            },
            {
                "type": "memberLeft",
                "source": { "type": "room", "roomId": "Rr" },
                "left": { "members": [{ "type": "user", "userId": "U3" }] }
            }
        ])))
        .unwrap();

        assert_eq!(
            events[0].kind,
            EventKind::MemberJoined {
                user_ids: vec!["U1".into(), "U2".into()]
            }
        );
        assert_eq!(events[0].actor_id, None);
        assert_eq!(events[1].conversation_id, "Rr");
        assert_eq!(events[1].reply_token, None);
    }

    #[test]
    fn irrelevant_and_broken_events_are_skipped() {
        let events = parse(&body(json!([
            { "type": "beacon", "source": { "type": "user", "userId": "U1" } },
            {
                "type": "message",
                "source": { "type": "user", "userId": "U1" },
                "message": { "type": "audio", "id": "m2" }
            },
            { "type": "message", "message": { "type": "text", "id": "m3", "text": "no source" } },
            { "type": "join", "replyToken": "rt", "source": { "type": "group", "groupId": "Cg" } }
        ])))
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Join);
    }

    #[test]
    fn empty_delivery_is_valid() {
        assert!(parse(&body(json!([]))).unwrap().is_empty());
    }

    #[test]
    fn non_json_body_is_rejected() {
        assert!(matches!(
            parse(b"<xml/>"),
            Err(DispatchError::MalformedBody(_))
        ));
        assert!(parse(br#"{"destination":"U"}"#).is_err());
    }
}
