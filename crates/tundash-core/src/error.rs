// ── Core error types ──
//
// User-facing errors from tundash-core. Consumers never see reqwest
// errors or JSON parse failures directly: the `From<tundash_api::Error>`
// impl folds transport-layer errors into `Transport` or `Stream`.

use thiserror::Error;

use crate::model::Variant;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Backend errors ───────────────────────────────────────────────
    /// Network failure or non-success HTTP status.
    #[error("Backend request failed: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    /// The log stream connection dropped.
    #[error("Log stream dropped: {reason}")]
    Stream { reason: String },

    // ── Edit errors ──────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Tunnel instance not found: {id}")]
    InstanceNotFound { id: String },

    #[error("Field {field} does not apply to {variant} instances")]
    VariantMismatch { field: String, variant: Variant },

    #[error("Tunnel instance id already in use: {id}")]
    DuplicateInstanceId { id: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Dashboard has been shut down")]
    DashboardClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this error came from the network or the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// HTTP status attached to a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tundash_api::Error> for CoreError {
    fn from(err: tundash_api::Error) -> Self {
        match err {
            tundash_api::Error::Transport(ref e) => CoreError::Transport {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            tundash_api::Error::InvalidUrl(e) => CoreError::validation("url", e.to_string()),
            tundash_api::Error::Tls(msg) => CoreError::Transport {
                message: format!("TLS error: {msg}"),
                status: None,
            },
            tundash_api::Error::Status { status, body } => CoreError::Transport {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                status: Some(status),
            },
            tundash_api::Error::Deserialization { message, body: _ } => CoreError::Transport {
                message: format!("unexpected response body: {message}"),
                status: None,
            },
            tundash_api::Error::Stream(reason) => CoreError::Stream { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_keep_code_and_body() {
        let err = CoreError::from(tundash_api::Error::Status {
            status: 500,
            body: "Saved but failed to start processes".into(),
        });
        assert!(err.is_transport());
        assert_eq!(err.status(), Some(500));
        assert_eq!(
            err.to_string(),
            "Backend request failed: HTTP 500: Saved but failed to start processes"
        );
    }

    #[test]
    fn stream_errors_map_to_stream() {
        let err = CoreError::from(tundash_api::Error::Stream("reset".into()));
        assert_eq!(
            err,
            CoreError::Stream {
                reason: "reset".into()
            }
        );
        assert!(!err.is_transport());
    }
}
