pub mod error;
pub mod types;

pub use error::{LineError, Result};
pub use types::{GroupSummary, OutboundMessage, MAX_MESSAGES_PER_REQUEST, MAX_TEXT_CHARS};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use types::{MemberCount, PushRequest, ReplyRequest};

pub const DEFAULT_API_BASE: &str = "https://api.line.me";

/// Outbound side of a conversation. Handlers depend on this, not on the
/// HTTP client.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Answer an event through its single-use reply token.
    async fn reply(&self, reply_token: &str, messages: &[OutboundMessage]) -> Result<()>;

    /// Send to a user, group, or room without a reply token.
    async fn push(&self, to: &str, messages: &[OutboundMessage]) -> Result<()>;

    async fn group_summary(&self, group_id: &str) -> Result<GroupSummary>;

    async fn group_member_count(&self, group_id: &str) -> Result<u32>;
}

pub struct LineClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl LineClient {
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, path, body = %body, "LINE API returned non-success");
            return Err(LineError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LineError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[OutboundMessage]) -> Result<()> {
        // A token can be used once, so overflow cannot go in a second request.
        let messages = if messages.len() > MAX_MESSAGES_PER_REQUEST {
            warn!(
                dropped = messages.len() - MAX_MESSAGES_PER_REQUEST,
                "Reply exceeds message limit, truncating"
            );
            &messages[..MAX_MESSAGES_PER_REQUEST]
        } else {
            messages
        };

        debug!(messages = messages.len(), "LINE reply");
        self.post(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages,
            },
        )
        .await
    }

    async fn push(&self, to: &str, messages: &[OutboundMessage]) -> Result<()> {
        for chunk in messages.chunks(MAX_MESSAGES_PER_REQUEST) {
            debug!(to, messages = chunk.len(), "LINE push");
            self.post(
                "/v2/bot/message/push",
                &PushRequest {
                    to,
                    messages: chunk,
                },
            )
            .await?;
        }
        Ok(())
    }

    async fn group_summary(&self, group_id: &str) -> Result<GroupSummary> {
        self.get(&format!("/v2/bot/group/{group_id}/summary")).await
    }

    async fn group_member_count(&self, group_id: &str) -> Result<u32> {
        let count: MemberCount = self
            .get(&format!("/v2/bot/group/{group_id}/members/count"))
            .await?;
        Ok(count.count)
    }
}
