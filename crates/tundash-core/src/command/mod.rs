// ── Command API ──
//
// All user-triggered operations flow through a unified `Command` enum.
// The dashboard routes each variant to the editor, store, poller or
// log consumer. Reads bypass the channel via direct snapshots.

use std::sync::Arc;

use crate::editor::{EditOutcome, GeneralPatch, InstanceDraft, InstancePatch};
use crate::error::CoreError;
use crate::model::{Configuration, InstanceId, Variant};
use crate::poller::PollOutcome;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All operations a surface can request from the dashboard.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Instance operations ──────────────────────────────────────────
    AddInstance {
        variant: Variant,
        draft: InstanceDraft,
    },
    UpdateInstance {
        id: InstanceId,
        patch: InstancePatch,
    },
    RemoveInstance {
        id: InstanceId,
    },
    SetEnabled {
        id: InstanceId,
        enabled: bool,
    },
    ToggleInstance {
        id: InstanceId,
    },

    // ── Service operations ───────────────────────────────────────────
    SetGeneral(GeneralPatch),
    ResetConfiguration,
    Restart,
    ReloadConfiguration,
    PollStatus,

    // ── Log stream ───────────────────────────────────────────────────
    ConnectLogs,
    DisconnectLogs,
    ClearLogs,
}

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Ok,
    Added(InstanceId),
    Configuration(Arc<Configuration>),
    Edited(EditOutcome),
    Polled(PollOutcome),
}
