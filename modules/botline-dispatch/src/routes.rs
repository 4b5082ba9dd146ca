use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::signature::SignatureVerifier;
use crate::webhook;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

pub struct WebhookState {
    pub verifier: SignatureVerifier,
    pub dispatcher: Dispatcher,
}

pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .with_state(state)
}

/// Verify, parse, acknowledge, fan out.
///
/// The `200 OK` does not wait for any handler: the platform redelivers on
/// non-success and reply tokens are single-use, so a redelivery is worse than
/// a dropped event.
async fn callback(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, DispatchError> {
    let delivery_id = Uuid::new_v4();

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(DispatchError::MissingSignature)?;

    if !state.verifier.verify(&body, signature) {
        warn!(%delivery_id, "Rejected webhook with invalid signature");
        return Err(DispatchError::InvalidSignature);
    }

    let events = webhook::parse(&body).inspect_err(|e| {
        warn!(%delivery_id, error = %e, "Rejected malformed webhook body");
    })?;

    info!(%delivery_id, events = events.len(), "Webhook accepted");

    // Handles dropped: units are detached and supervise themselves.
    let _ = state.dispatcher.dispatch(delivery_id, events);

    Ok(StatusCode::OK)
}
