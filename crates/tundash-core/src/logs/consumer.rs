// ── Log stream consumer ──
//
// Reads the server-push log stream into the bounded log view. On any
// stream error or end the consumer reports `Down` and stops; it never
// reconnects on its own. A new `connect()` starts a fresh session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::StreamExt;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use tundash_api::LogFrame;

use super::view::{AppendOutcome, LogView};
use crate::backend::{Backend, LogFrames};
use crate::convert::parse_log_record;
use crate::error::CoreError;
use crate::model::LogEntry;

const APPENDED_CHANNEL_SIZE: usize = 256;

/// Connection state of the log stream, observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Live,
    /// The stream failed or ended. Stays here until the next `connect()`.
    Down { reason: String },
}

struct Session {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
pub struct LogStreamConsumer {
    inner: Arc<ConsumerInner>,
}

struct ConsumerInner {
    backend: Arc<dyn Backend>,
    view: RwLock<LogView>,
    state: watch::Sender<StreamState>,
    appended: broadcast::Sender<Arc<LogEntry>>,
    session: Mutex<Option<Session>>,
    dropped: AtomicU64,
}

impl LogStreamConsumer {
    pub fn new(backend: Arc<dyn Backend>, capacity: usize, autoscroll_threshold_px: f64) -> Self {
        let (state, _) = watch::channel(StreamState::Disconnected);
        let (appended, _) = broadcast::channel(APPENDED_CHANNEL_SIZE);
        Self {
            inner: Arc::new(ConsumerInner {
                backend,
                view: RwLock::new(LogView::new(capacity, autoscroll_threshold_px)),
                state,
                appended,
                session: Mutex::new(None),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the stream. A no-op while a session is live.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if let Some(existing) = session.as_ref() {
            let down = matches!(*self.inner.state.borrow(), StreamState::Down { .. });
            if !down && !existing.handle.is_finished() {
                return Ok(());
            }
        }

        self.inner.state.send_replace(StreamState::Connecting);
        let frames = match self.inner.backend.open_logs().await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, "log stream connect failed");
                self.inner.state.send_replace(StreamState::Down {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        self.inner.state.send_replace(StreamState::Live);
        let handle = tokio::spawn(read_task(self.inner.clone(), frames, cancel.clone()));
        *session = Some(Session { cancel, handle });
        info!("log stream connected");
        Ok(())
    }

    /// Close the stream. Idempotent.
    pub async fn disconnect(&self) {
        let session = self.inner.session.lock().await.take();
        if let Some(session) = session {
            session.cancel.cancel();
            let _ = session.handle.await;
            debug!("log stream closed");
        }
        self.inner.state.send_replace(StreamState::Disconnected);
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn state(&self) -> StreamState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.inner.state.subscribe()
    }

    /// Every accepted entry, in arrival order.
    pub fn subscribe_appended(&self) -> broadcast::Receiver<Arc<LogEntry>> {
        self.inner.appended.subscribe()
    }

    /// Records dropped because they could not be parsed or were too long.
    pub fn dropped_records(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    // ── View access ──────────────────────────────────────────────────

    /// Run `f` against the current view.
    pub fn with_view<R>(&self, f: impl FnOnce(&LogView) -> R) -> R {
        let view = self.inner.view.read().unwrap_or_else(PoisonError::into_inner);
        f(&view)
    }

    /// A copy of the current view.
    pub fn view(&self) -> LogView {
        self.with_view(LogView::clone)
    }

    /// Buffered entries, oldest first.
    pub fn lines(&self) -> Vec<Arc<LogEntry>> {
        self.with_view(|v| v.buffer().iter().cloned().collect())
    }

    pub fn set_viewport(&self, client_height: f64, scroll_top: f64) {
        self.inner.with_view_mut(|v| v.set_viewport(client_height, scroll_top));
    }

    pub fn set_line_height(&self, line_height: f64) {
        self.inner.with_view_mut(|v| v.set_line_height(line_height));
    }

    pub fn scroll_to_bottom(&self) {
        self.inner.with_view_mut(LogView::scroll_to_bottom);
    }

    pub fn clear(&self) {
        self.inner.with_view_mut(LogView::clear);
    }

    /// Feed one frame as if it came off the stream.
    pub fn ingest_frame(&self, frame: LogFrame) -> Option<AppendOutcome> {
        self.inner.ingest(frame)
    }
}

impl ConsumerInner {
    fn with_view_mut<R>(&self, f: impl FnOnce(&mut LogView) -> R) -> R {
        let mut view = self.view.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut view)
    }

    fn ingest(&self, frame: LogFrame) -> Option<AppendOutcome> {
        let text = match frame {
            LogFrame::Record(text) => text,
            LogFrame::Heartbeat => {
                trace!("log stream heartbeat");
                return None;
            }
            LogFrame::Oversized(bytes) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(bytes, "dropping oversized log line");
                return None;
            }
        };

        let Some(entry) = parse_log_record(&text) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(record = %text, "dropping malformed log record");
            return None;
        };

        let entry = Arc::new(entry);
        let outcome = self.with_view_mut(|v| v.append(entry.clone()));
        let _ = self.appended.send(entry);
        Some(outcome)
    }
}

// ── Background task ──────────────────────────────────────────────────

async fn read_task(inner: Arc<ConsumerInner>, mut frames: LogFrames, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            frame = frames.next() => match frame {
                Some(Ok(frame)) => {
                    inner.ingest(frame);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "log stream dropped");
                    inner.state.send_replace(StreamState::Down { reason: e.to_string() });
                    return;
                }
                None => {
                    info!("log stream closed by backend");
                    inner.state.send_replace(StreamState::Down {
                        reason: "stream closed by backend".into(),
                    });
                    return;
                }
            },
        }
    }
}
