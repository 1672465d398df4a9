// ── Log entries ──

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Source label used when a record names no process.
pub const SYSTEM_SOURCE: &str = "system";

/// One line of process output, kept in stream arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Backend timestamp, if the record carried one.
    pub timestamp: Option<DateTime<Utc>>,
    /// Emitting process id, or [`SYSTEM_SOURCE`].
    pub source: String,
    /// `stdout` / `stderr`, when known.
    pub stream: Option<String>,
    pub content: String,
}

impl LogEntry {
    pub fn is_stderr(&self) -> bool {
        self.stream.as_deref() == Some("stderr")
    }
}
