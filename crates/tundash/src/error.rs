//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tundash_config::ConfigError;
use tundash_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Backend ──────────────────────────────────────────────────────
    #[error("Dashboard request failed: {message}")]
    #[diagnostic(
        code(tundash::backend),
        help(
            "Check that the dashboard backend is running and reachable.\n\
             Try: tundash status -v"
        )
    )]
    Backend {
        message: String,
        status: Option<u16>,
    },

    #[error("Log stream dropped: {reason}")]
    #[diagnostic(code(tundash::log_stream))]
    LogStream { reason: String },

    #[error("Configuration saved but not applied: {reason}")]
    #[diagnostic(
        code(tundash::not_applied),
        help("The new configuration is stored on the backend. Retry with: tundash restart")
    )]
    NotApplied { reason: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(tundash::not_found),
        help("Run: tundash {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(tundash::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tundash::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tundash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: tundash config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No dashboard URL configured")]
    #[diagnostic(
        code(tundash::no_config),
        help(
            "Pass --url, set TUNDASH_URL, or create a profile with: tundash config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(tundash::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(tundash::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(tundash::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Backend {
                status: Some(404), ..
            } => exit_code::NOT_FOUND,
            Self::Backend { .. } | Self::LogStream { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::NotApplied { .. } => exit_code::PARTIAL,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            Self::Config(_) | Self::Internal(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message, status } => CliError::Backend { message, status },

            CoreError::Stream { reason } => CliError::LogStream { reason },

            CoreError::Validation { field, reason } => CliError::Validation { field, reason },

            CoreError::InstanceNotFound { id } => CliError::NotFound {
                resource_type: "instance".into(),
                identifier: id,
                list_command: "instances list".into(),
            },

            CoreError::VariantMismatch { field, variant } => CliError::Validation {
                field,
                reason: format!("not applicable to {variant} instances"),
            },

            CoreError::DuplicateInstanceId { id } => CliError::Conflict {
                resource_type: "instance".into(),
                identifier: id,
            },

            CoreError::DashboardClosed => {
                CliError::Internal("dashboard was shut down before the command ran".into())
            }

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let not_found = CliError::from(CoreError::InstanceNotFound { id: "x".into() });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let transport = CliError::from(CoreError::Transport {
            message: "connection refused".into(),
            status: None,
        });
        assert_eq!(transport.exit_code(), exit_code::CONNECTION);

        let duplicate = CliError::from(CoreError::DuplicateInstanceId { id: "c1".into() });
        assert_eq!(duplicate.exit_code(), exit_code::CONFLICT);
    }

    #[test]
    fn config_validation_is_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "url".into(),
            reason: "bad".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
