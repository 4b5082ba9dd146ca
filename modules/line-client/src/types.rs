use serde::{Deserialize, Serialize};

/// LINE caps a single reply or push at five message objects.
pub const MAX_MESSAGES_PER_REQUEST: usize = 5;

/// LINE caps a text message at 5000 characters.
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    Text { text: String },
    Sticker { package_id: String, sticker_id: String },
}

impl OutboundMessage {
    /// Text message, truncated to the platform limit on a char boundary.
    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let text = match text.char_indices().nth(MAX_TEXT_CHARS) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text,
        };
        OutboundMessage::Text { text }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OutboundMessage::Text { text } => Some(text),
            OutboundMessage::Sticker { .. } => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [OutboundMessage],
}

#[derive(Debug, Serialize)]
pub(crate) struct PushRequest<'a> {
    pub to: &'a str,
    pub messages: &'a [OutboundMessage],
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberCount {
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_use_platform_field_names() {
        let sticker = OutboundMessage::Sticker {
            package_id: "446".into(),
            sticker_id: "1988".into(),
        };
        assert_eq!(
            serde_json::to_value(&sticker).unwrap(),
            json!({ "type": "sticker", "packageId": "446", "stickerId": "1988" })
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::text("hi")).unwrap(),
            json!({ "type": "text", "text": "hi" })
        );
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let long = "é".repeat(MAX_TEXT_CHARS + 10);
        let message = OutboundMessage::text(long);
        assert_eq!(message.as_text().unwrap().chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn summary_without_picture() {
        let summary: GroupSummary =
            serde_json::from_value(json!({ "groupId": "C1", "groupName": "Hikers" })).unwrap();
        assert_eq!(summary.group_name, "Hikers");
        assert_eq!(summary.picture_url, None);
    }
}
