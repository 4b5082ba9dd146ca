pub mod commands;
pub mod handler;
pub mod reply;

use std::sync::Arc;

use axum::{routing::get, Router};
use botline_dispatch::{webhook_router, WebhookState};

pub use handler::{BotHandler, GREETING, UNKNOWN_SENDER};
pub use reply::{EchoReplyGenerator, ReplyGenerator};

/// Health check plus the webhook callback, with a request span per call.
pub fn app(webhook: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .merge(webhook_router(webhook))
        // Method + path only; bodies carry user messages.
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
