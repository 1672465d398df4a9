// Wire models for the dashboard backend.
//
// These mirror the JSON documents exactly as the backend serves them.
// Historical encodings are tolerated on input (`null` arrays, raw-string
// iptables output). Port fields stay raw JSON: the backend stores them
// as free-form strings, and older documents carry numbers. Unknown
// fields are captured in `extra` so a fetch-mutate-push cycle never
// strips fields this client does not understand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Configuration document ──────────────────────────────────────────

/// The full configuration document served by `GET /api/config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub general: GeneralSection,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub clients: Vec<ClientEntry>,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub servers: Vec<ServerEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: default_log_level(),
            extra: Map::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

/// A client-mode tunnel entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub local_addr: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub local_port: Option<Value>,
    #[serde(default)]
    pub remote_addr: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<Value>,
    #[serde(flatten)]
    pub tunnel: TunnelFields,
}

/// A server-mode tunnel entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub local_port: Option<Value>,
    #[serde(default)]
    pub remote_addr: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<Value>,
    #[serde(flatten)]
    pub tunnel: TunnelFields,
}

/// Fields shared by both tunnel roles: the TUN endpoint pair plus the
/// advanced options. Also carries unknown per-entry fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelFields {
    #[serde(default)]
    pub tun_local: String,
    #[serde(default)]
    pub tun_peer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tun_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tun_local_ipv6: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tun_peer_ipv6: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub handshake_file: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ipv4_only: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

// ── Status document ─────────────────────────────────────────────────

/// The runtime status document served by `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Service master switch as the backend currently sees it.
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub processes: Vec<ProcessEntry>,

    #[serde(default)]
    pub diagnostics: Option<DiagnosticsEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub local: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub tun_local: Option<String>,
    #[serde(default)]
    pub tun_peer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsEntry {
    #[serde(default)]
    pub binaries: Option<BinariesEntry>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub interfaces: Vec<InterfaceEntry>,
    #[serde(default)]
    pub iptables: Option<IptablesEntry>,
}

/// Binary lookup result. Each path field holds either a content hash or
/// the literal string `"missing"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinariesEntry {
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub ok: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceEntry {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub addrs: Vec<String>,
}

/// Firewall rule counters, or the raw rule dump from older backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IptablesEntry {
    Counters(IptablesCounters),
    Raw(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IptablesCounters {
    #[serde(default)]
    pub masquerade: u64,
    #[serde(default)]
    pub dnat: u64,
    #[serde(default)]
    pub total: u64,
}

// ── Firewall rules ──────────────────────────────────────────────────

/// Response of `GET /api/iptables`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallRules {
    #[serde(default)]
    pub raw: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub rules: Vec<String>,
}

// ── Log records ─────────────────────────────────────────────────────

/// One JSON-encoded log record carried by the log stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, alias = "source")]
    pub process_id: Option<String>,
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default, alias = "message")]
    pub content: Option<String>,
}

// ── Serde helpers ───────────────────────────────────────────────────

/// Treat an explicit `null` array the same as a missing one.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keep an explicit `null` distinct from a missing field, so it is
/// written back as `null` rather than dropped.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
