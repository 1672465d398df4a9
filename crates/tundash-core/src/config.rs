// ── Runtime dashboard configuration ──
//
// Describes which backend to talk to and how the reconciliation layer
// is tuned. Core never reads config files: the CLI resolves a profile
// into a `DashboardConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_LOG_CAPACITY: usize = 1000;
pub const DEFAULT_AUTOSCROLL_THRESHOLD_PX: f64 = 50.0;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Dashboard root, e.g. `http://10.0.0.5:8080`.
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout. Does not apply to the log stream.
    pub timeout: Duration,
    /// Status poll period. Zero disables the background poller.
    pub poll_interval: Duration,
    /// Log ring buffer size in lines.
    pub log_capacity: usize,
    /// Distance from the bottom, in pixels, within which new log lines
    /// keep the view pinned to the tail.
    pub autoscroll_threshold_px: f64,
    /// Re-apply the configuration after enable/disable edits.
    pub restart_on_toggle: bool,
    /// Connect the log stream on `Dashboard::start`.
    pub stream_logs: bool,
}

impl DashboardConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_capacity: DEFAULT_LOG_CAPACITY,
            autoscroll_threshold_px: DEFAULT_AUTOSCROLL_THRESHOLD_PX,
            restart_on_toggle: true,
            stream_logs: true,
        }
    }

    /// Settings for a single request-response run: no background poll
    /// and no log stream.
    pub fn oneshot(mut self) -> Self {
        self.poll_interval = Duration::ZERO;
        self.stream_logs = false;
        self
    }
}
