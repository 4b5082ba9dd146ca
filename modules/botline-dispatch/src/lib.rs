//! Webhook intake and supervised event fan-out.
//!
//! A delivery is verified and parsed on the request path, acknowledged with
//! `200 OK`, and every relevant event is handed to its own tokio task. Handler
//! errors, panics and deadline overruns are logged there and never reach the
//! transport response.

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod routes;
pub mod signature;
pub mod webhook;

pub use dispatcher::{Dispatcher, UnitOutcome};
pub use error::DispatchError;
pub use handler::{DeadlineExceeded, EventContext, EventHandler};
pub use routes::{webhook_router, WebhookState, SIGNATURE_HEADER};
pub use signature::SignatureVerifier;
