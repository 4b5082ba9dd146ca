//! One supervised tokio task per event.
//!
//! Each unit runs the handler in its own spawned task and waits for it with
//! the event deadline. A panic surfaces as a `JoinError` and is recorded as
//! `Recovered`; an elapsed deadline stops the wait but leaves the handler
//! running to observe its own deadline. Nothing bounds the number of units.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use botline_common::NormalizedEvent;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::handler::{EventContext, EventHandler};

/// How a dispatched unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Completed,
    Failed(String),
    /// The handler panicked; the panic was contained.
    Recovered(String),
    /// The deadline passed first. The handler may still be running.
    TimedOut,
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOutcome::Completed => write!(f, "completed"),
            UnitOutcome::Failed(_) => write!(f, "failed"),
            UnitOutcome::Recovered(_) => write!(f, "recovered"),
            UnitOutcome::TimedOut => write!(f, "timed_out"),
        }
    }
}

// ---------------------------------------------------------------------------
// In-flight accounting (a counter, not a registry)
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

struct InFlightGuard(Arc<InFlight>);

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Dispatcher {
    handler: Arc<dyn EventHandler>,
    timeout: Duration,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn EventHandler>, timeout: Duration) -> Self {
        Self {
            handler,
            timeout,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Start one unit per event and return immediately.
    ///
    /// The returned handles resolve to each unit's outcome. Dropping them
    /// detaches the units; they run to completion regardless.
    pub fn dispatch(
        &self,
        delivery_id: Uuid,
        events: Vec<NormalizedEvent>,
    ) -> Vec<JoinHandle<UnitOutcome>> {
        events
            .into_iter()
            .map(|event| self.spawn_unit(delivery_id, event))
            .collect()
    }

    /// Handler executions that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for in-flight handlers to finish.
    /// Returns how many were still running when the wait gave up.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let wait_idle = async {
            loop {
                let idle = self.in_flight.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                idle.await;
            }
        };

        match tokio::time::timeout(timeout, wait_idle).await {
            Ok(()) => 0,
            Err(_) => self.in_flight(),
        }
    }

    fn spawn_unit(&self, delivery_id: Uuid, event: NormalizedEvent) -> JoinHandle<UnitOutcome> {
        // Counted before spawning so a drain right after dispatch sees it.
        let guard = self.in_flight.enter();
        let handler = self.handler.clone();
        let ctx = EventContext::new(delivery_id, self.timeout);

        tokio::spawn(async move {
            let started = Instant::now();
            let kind = event.kind.name();
            let conversation_id = event.conversation_id.clone();
            let actor_id = event.actor().to_string();

            let work_ctx = ctx.clone();
            let mut work = tokio::spawn(async move {
                let _guard = guard;
                handler.handle(&work_ctx, event).await
            });

            let outcome = match tokio::time::timeout_at(ctx.deadline(), &mut work).await {
                Ok(Ok(Ok(()))) => UnitOutcome::Completed,
                Ok(Ok(Err(e))) => UnitOutcome::Failed(format!("{e:#}")),
                Ok(Err(join_err)) if join_err.is_panic() => {
                    UnitOutcome::Recovered(panic_message(join_err.into_panic()))
                }
                Ok(Err(join_err)) => UnitOutcome::Failed(join_err.to_string()),
                Err(_) => UnitOutcome::TimedOut,
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                UnitOutcome::Completed => info!(
                    %delivery_id, %conversation_id, %actor_id, kind, elapsed_ms,
                    "Event handled"
                ),
                UnitOutcome::Failed(reason) => warn!(
                    %delivery_id, %conversation_id, %actor_id, kind, elapsed_ms,
                    error = %reason,
                    "Event handler failed"
                ),
                UnitOutcome::Recovered(panic) => error!(
                    %delivery_id, %conversation_id, %actor_id, kind, elapsed_ms,
                    panic = %panic,
                    "Event handler panicked"
                ),
                UnitOutcome::TimedOut => warn!(
                    %delivery_id, %conversation_id, %actor_id, kind, elapsed_ms,
                    "Event handler exceeded its deadline, no longer waiting"
                ),
            }

            outcome
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use botline_common::EventKind;

    struct Sleepy;

    #[async_trait]
    impl EventHandler for Sleepy {
        async fn handle(&self, _ctx: &EventContext, _event: NormalizedEvent) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(())
        }
    }

    fn text(conversation: &str) -> NormalizedEvent {
        NormalizedEvent::new(conversation, EventKind::Text { text: "hi".into() })
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_waiting_without_aborting() {
        let dispatcher = Dispatcher::new(Arc::new(Sleepy), Duration::from_secs(10));
        let mut handles = dispatcher.dispatch(Uuid::new_v4(), vec![text("c1")]);

        let outcome = handles.remove(0).await.unwrap();
        assert_eq!(outcome, UnitOutcome::TimedOut);
        // The handler itself is still running.
        assert_eq!(dispatcher.in_flight(), 1);

        assert_eq!(dispatcher.drain(Duration::from_secs(200)).await, 0);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_timeout() {
        let dispatcher = Dispatcher::new(Arc::new(Sleepy), Duration::from_secs(300));
        let _handles = dispatcher.dispatch(Uuid::new_v4(), vec![text("c1"), text("c2")]);

        assert_eq!(dispatcher.drain(Duration::from_secs(1)).await, 2);
    }

    #[tokio::test]
    async fn drain_with_nothing_in_flight_returns_immediately() {
        let dispatcher = Dispatcher::new(Arc::new(Sleepy), Duration::from_secs(1));
        assert_eq!(dispatcher.drain(Duration::from_millis(10)).await, 0);
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "non-string panic payload");
    }
}
