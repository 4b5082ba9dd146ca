use async_trait::async_trait;
use botline_common::{ConversationHistory, Role};

/// Produces the bot's answer to a conversation. The history passed in
/// already ends with the user's latest message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, history: &ConversationHistory) -> anyhow::Result<String>;
}

/// Repeats the latest user message. Stands in until a model is wired up.
pub struct EchoReplyGenerator;

#[async_trait]
impl ReplyGenerator for EchoReplyGenerator {
    async fn generate(&self, history: &ConversationHistory) -> anyhow::Result<String> {
        let last = history
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(last.to_string())
    }
}
