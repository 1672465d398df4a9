// ── Domain model ──
//
// Canonical representations of the dashboard's three resources:
// configuration, runtime status and the log stream.

pub mod configuration;
pub mod instance;
pub mod log;
pub mod status;

pub use configuration::{Configuration, GeneralSettings, LogLevel};
pub use instance::{AdvancedOptions, Endpoint, InstanceId, Port, TunnelInstance, Variant};
pub use log::{LogEntry, SYSTEM_SOURCE};
pub use status::{
    BinaryInfo, Diagnostics, FirewallCounters, FirewallRules, ProcessStatus, StatusSnapshot,
    StatusSummary, TunInterface,
};
