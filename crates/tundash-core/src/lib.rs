//! State reconciliation layer between `tundash-api` and dashboard
//! surfaces (CLI today, anything that can render a table or a graph).
//!
//! - **[`Dashboard`]**: facade owning the full lifecycle.
//!   [`start()`](Dashboard::start) loads the configuration and spawns
//!   the status poller, log stream, topology renderer and command
//!   processor. [`Dashboard::oneshot()`] runs a single request-response
//!   cycle for CLI invocations.
//!
//! - **[`ConfigStore`]**: the local copy of the remote configuration.
//!   Every edit is one fetch-mutate-push [`commit`](ConfigStore::commit)
//!   against the remote document; concurrent commits are last-write-wins.
//!
//! - **[`StatusPoller`]**: non-overlapping periodic status polls
//!   published as wholesale-replaced [`StatusSnapshot`]s.
//!
//! - **[`LogStreamConsumer`]**: reads the server-push log stream into a
//!   bounded [`LogView`] with scroll-aware tail following.
//!
//! - **[`topology`]**: pure rendering of configuration plus status into
//!   a [`TopologyGraph`], and animation diffs between renders.
//!
//! - **[`Backend`]**: the seam between this crate and the transport.
//!   [`HttpBackend`] is the production implementation.

pub mod backend;
pub mod command;
pub mod config;
pub mod convert;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod logs;
pub mod model;
pub mod poller;
pub mod store;
pub mod stream;
pub mod topology;

#[cfg(test)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{Backend, HttpBackend, LogFrames};
pub use command::{Command, CommandResult};
pub use config::{DashboardConfig, TlsVerification};
pub use dashboard::{Dashboard, DashboardState};
pub use editor::{ApplyState, EditOutcome, GeneralPatch, InstanceDraft, InstanceEditor, InstancePatch};
pub use error::CoreError;
pub use logs::{LogBuffer, LogStreamConsumer, LogView, StreamState, Viewport};
pub use poller::{Freshness, PollOutcome, StatusPoller};
pub use store::ConfigStore;
pub use stream::Subscription;
pub use topology::{
    AnimationChange, AnimationTransition, LabelSource, NodeKind, TopologyGraph, TopologyNode,
    TopologyRow, TopologyView,
};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AdvancedOptions, BinaryInfo, Configuration, Diagnostics, Endpoint, FirewallCounters,
    FirewallRules, GeneralSettings, InstanceId, LogEntry, LogLevel, Port, ProcessStatus,
    StatusSnapshot, StatusSummary, TunInterface, TunnelInstance, Variant,
};
