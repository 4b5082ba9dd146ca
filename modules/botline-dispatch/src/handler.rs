use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use botline_common::NormalizedEvent;
use tokio::time::Instant;
use uuid::Uuid;

/// Application logic invoked once per normalized event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &EventContext, event: NormalizedEvent) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("event handler deadline exceeded")]
pub struct DeadlineExceeded;

/// Execution context for one dispatched event.
///
/// Created fresh per event, independent of the HTTP request that delivered
/// it. The dispatcher stops waiting at the deadline but does not abort the
/// handler, so handlers wrap their own I/O in `run` to stop on time.
#[derive(Debug, Clone)]
pub struct EventContext {
    delivery_id: Uuid,
    deadline: Instant,
}

impl EventContext {
    pub fn new(delivery_id: Uuid, timeout: Duration) -> Self {
        Self {
            delivery_id,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn delivery_id(&self) -> Uuid {
        self.delivery_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Drive `fut` until it completes or the deadline passes.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        tokio::time::timeout_at(self.deadline, fut)
            .await
            .map_err(|_| DeadlineExceeded)
    }
}
