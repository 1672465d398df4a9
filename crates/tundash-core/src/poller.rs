// ── Status poller ──
//
// Periodically fetches runtime status and publishes it as a snapshot
// that replaces the previous one wholesale. Failures keep the previous
// snapshot and are only visible through `freshness()`. Polls never
// overlap: the timer skips missed ticks and an in-flight gate turns a
// concurrent manual poll into a no-op.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::CoreError;
use crate::model::StatusSnapshot;
use crate::stream::Subscription;

/// What a single poll attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new snapshot was published.
    Updated,
    /// The fetch failed; the previous snapshot was kept.
    Failed(CoreError),
    /// Another poll was already in flight.
    Skipped,
}

/// How current the published snapshot is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale {
        last_success: DateTime<Utc>,
        last_error: Option<String>,
    },
    Never {
        last_error: Option<String>,
    },
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

#[derive(Debug, Default)]
struct PollHealth {
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cheaply cloneable handle to the poller.
#[derive(Clone)]
pub struct StatusPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    backend: Arc<dyn Backend>,
    snapshot: watch::Sender<Arc<StatusSnapshot>>,
    in_flight: tokio::sync::Mutex<()>,
    health: Mutex<PollHealth>,
    task: Mutex<Option<PollTask>>,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(StatusSnapshot::default()));
        Self {
            inner: Arc::new(PollerInner {
                backend,
                snapshot,
                in_flight: tokio::sync::Mutex::new(()),
                health: Mutex::new(PollHealth::default()),
                task: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start polling every `interval`, beginning immediately.
    ///
    /// Returns `false` without doing anything if the poller is already
    /// running or `interval` is zero.
    pub fn start(&self, interval: Duration) -> bool {
        if interval.is_zero() {
            return false;
        }

        let mut slot = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_task(self.clone(), interval, cancel.clone()));
        *slot = Some(PollTask { cancel, handle });
        info!(interval_ms = interval.as_millis(), "status poller started");
        true
    }

    /// Stop the timer. A poll in flight is abandoned and its result
    /// discarded. Idempotent.
    pub async fn stop(&self) {
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            task.cancel.cancel();
            let _ = task.handle.await;
            info!("status poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Poll once, unless a poll is already in flight.
    pub async fn poll_now(&self) -> PollOutcome {
        let Ok(_guard) = self.inner.in_flight.try_lock() else {
            debug!("status poll already in flight, skipping");
            return PollOutcome::Skipped;
        };

        match self.inner.backend.fetch_status().await {
            Ok(mut snapshot) => {
                let now = Utc::now();
                snapshot.fetched_at = Some(now);
                {
                    let mut health = self.health();
                    health.last_success = Some(now);
                    health.last_error = None;
                }
                debug!(processes = snapshot.processes.len(), "status snapshot replaced");
                self.inner.snapshot.send_replace(Arc::new(snapshot));
                PollOutcome::Updated
            }
            Err(e) => {
                warn!(error = %e, "status poll failed, keeping previous snapshot");
                self.health().last_error = Some(e.to_string());
                PollOutcome::Failed(e)
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> Subscription<StatusSnapshot> {
        Subscription::new(self.inner.snapshot.subscribe())
    }

    /// Whether the last successful poll is at most `max_age` old.
    pub fn freshness(&self, max_age: Duration) -> Freshness {
        let health = self.health();
        let Some(last_success) = health.last_success else {
            return Freshness::Never {
                last_error: health.last_error.clone(),
            };
        };

        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        if Utc::now().signed_duration_since(last_success) <= max_age {
            Freshness::Fresh
        } else {
            Freshness::Stale {
                last_success,
                last_error: health.last_error.clone(),
            }
        }
    }

    fn health(&self) -> std::sync::MutexGuard<'_, PollHealth> {
        self.inner
            .health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Background task ──────────────────────────────────────────────────

async fn poll_task(poller: StatusPoller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = poller.poll_now() => {}
                }
            }
        }
    }
}
