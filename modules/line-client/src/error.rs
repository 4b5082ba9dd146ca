use thiserror::Error;

pub type Result<T> = std::result::Result<T, LineError>;

#[derive(Debug, Error)]
pub enum LineError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl LineError {
    /// Reply tokens are single-use and expire; the API answers 400 for both.
    pub fn is_rejected_reply_token(&self) -> bool {
        matches!(self, LineError::Api { status: 400, body } if body.contains("reply token"))
    }
}

impl From<reqwest::Error> for LineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LineError::Parse(err.to_string())
        } else {
            LineError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LineError {
    fn from(err: serde_json::Error) -> Self {
        LineError::Parse(err.to_string())
    }
}
