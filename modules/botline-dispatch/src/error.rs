use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Failures before a delivery is acknowledged. Once parsing succeeds nothing
/// is reported to the transport.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("signature does not match request body")]
    InvalidSignature,

    #[error("malformed webhook body: {0}")]
    MalformedBody(#[source] serde_json::Error),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::MissingSignature | DispatchError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            DispatchError::MalformedBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
