//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use tundash_core::{
    ApplyState, Dashboard, EditOutcome, Freshness, InstanceId, Port, StatusSnapshot,
    TunnelInstance,
};

use crate::error::CliError;

/// Look up an instance in the loaded configuration.
pub fn find_instance(dashboard: &Dashboard, id: &str) -> Result<TunnelInstance, CliError> {
    dashboard
        .store()
        .snapshot()
        .instance(&InstanceId::from(id))
        .cloned()
        .ok_or_else(|| CliError::NotFound {
            resource_type: "instance".into(),
            identifier: id.into(),
            list_command: "instances list".into(),
        })
}

/// The status snapshot taken at startup. Fails when no poll succeeded.
pub fn require_status(dashboard: &Dashboard) -> Result<Arc<StatusSnapshot>, CliError> {
    match dashboard.poller().freshness(Duration::MAX) {
        Freshness::Never { last_error } => Err(CliError::Backend {
            message: last_error.unwrap_or_else(|| "no status received".into()),
            status: None,
        }),
        Freshness::Fresh | Freshness::Stale { .. } => Ok(dashboard.poller().snapshot()),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Report the restart half of an edit. A failed restart is an error
/// even though the configuration was saved.
pub fn finish_edit(outcome: &EditOutcome, what: &str, quiet: bool) -> Result<(), CliError> {
    match &outcome.apply {
        ApplyState::Applied => {
            if !quiet {
                eprintln!("{what}; service restarted");
            }
            Ok(())
        }
        ApplyState::NotRequested => {
            if !quiet {
                eprintln!("{what}");
            }
            Ok(())
        }
        ApplyState::Failed(e) => Err(CliError::NotApplied {
            reason: e.to_string(),
        }),
    }
}

/// `-` for empty values in tables.
pub fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".into()
    } else {
        value.to_owned()
    }
}

/// The port as stored, even when it is not a number, or `-` when unset.
pub fn port_or_dash(port: &Port) -> String {
    if port.is_unset() {
        "-".into()
    } else {
        port.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_render_as_dash() {
        assert_eq!(port_or_dash(&Port::default()), "-");
        assert_eq!(port_or_dash(&Port::from(4567)), "4567");
        assert_eq!(or_dash("  "), "-");
    }
}
