// ── Runtime status ──
//
// Everything the status poller learns in one round trip. A snapshot is
// replaced wholesale on every successful poll, never merged.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::instance::{InstanceId, Variant};

/// Runtime state of one tunnel process, keyed by instance id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub id: InstanceId,
    pub alias: String,
    pub variant: Option<Variant>,
    pub running: bool,
    pub pid: Option<u32>,
    /// Resolved endpoint strings as the backend sees them.
    pub local: Option<String>,
    pub remote: Option<String>,
    pub tun_local: Option<String>,
    pub tun_peer: Option<String>,
}

// ── Diagnostics ─────────────────────────────────────────────────────

/// Binary lookup: each field is a content hash, or `None` when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BinaryInfo {
    pub client: Option<String>,
    pub server: Option<String>,
    pub ok: bool,
}

impl BinaryInfo {
    pub fn client_present(&self) -> bool {
        self.client.is_some()
    }

    pub fn server_present(&self) -> bool {
        self.server.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TunInterface {
    pub name: String,
    pub status: String,
    pub addrs: Vec<String>,
}

impl TunInterface {
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("up")
    }
}

/// NAT rule counters, or the raw dump when the backend sends text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FirewallCounters {
    Counts { masquerade: u64, dnat: u64, total: u64 },
    Raw(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub binaries: Option<BinaryInfo>,
    pub interfaces: Vec<TunInterface>,
    pub firewall: Option<FirewallCounters>,
}

/// Full firewall rule listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirewallRules {
    pub raw: String,
    pub rules: Vec<String>,
}

// ── StatusSnapshot ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Processes in the order the backend reported them.
    pub processes: IndexMap<InstanceId, ProcessStatus>,
    pub diagnostics: Diagnostics,
    /// The backend's view of the service master switch.
    pub service_enabled: Option<bool>,
    /// When the poll completed. `None` until the first success.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Running/total counts for the service badge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub running: usize,
    pub total: usize,
}

impl StatusSummary {
    pub fn any_running(&self) -> bool {
        self.running > 0
    }
}

impl StatusSnapshot {
    pub fn get(&self, id: &InstanceId) -> Option<&ProcessStatus> {
        self.processes.get(id)
    }

    /// `true` only when the backend reports the process as running.
    pub fn is_running(&self, id: &InstanceId) -> bool {
        self.get(id).is_some_and(|p| p.running)
    }

    pub fn summary(&self) -> StatusSummary {
        StatusSummary {
            running: self.processes.values().filter(|p| p.running).count(),
            total: self.processes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(id: &str, running: bool) -> ProcessStatus {
        ProcessStatus {
            id: id.into(),
            running,
            ..ProcessStatus::default()
        }
    }

    #[test]
    fn default_process_is_idle_and_unnamed() {
        let p = ProcessStatus::default();
        assert!(p.id.is_empty());
        assert!(!p.running);
        assert_eq!(p.pid, None);
    }

    #[test]
    fn summary_counts_running_processes() {
        let mut snapshot = StatusSnapshot::default();
        for p in [process("a", true), process("b", false), process("c", true)] {
            snapshot.processes.insert(p.id.clone(), p);
        }

        assert_eq!(
            snapshot.summary(),
            StatusSummary {
                running: 2,
                total: 3
            }
        );
        assert!(snapshot.is_running(&"a".into()));
        assert!(!snapshot.is_running(&"b".into()));
        assert!(!snapshot.is_running(&"zzz".into()));
    }

    #[test]
    fn interface_status_is_case_insensitive() {
        let iface = TunInterface {
            name: "tun0".into(),
            status: "UP".into(),
            addrs: vec![],
        };
        assert!(iface.is_up());
    }
}
