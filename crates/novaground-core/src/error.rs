// ── Core error types ──
//
// User-facing errors from novaground-core. Consumers never see raw HTTP
// status codes or JSON parse failures directly -- the
// `From<novaground_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants, and the local command-rejection
// taxonomy lives here because no network call is ever made for those.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local command rejections (no request was sent) ───────────────
    #[error("Actuators are locked -- unlock to change states")]
    Locked,

    #[error("A command for '{name}' is already in flight")]
    Busy { name: String },

    #[error("'{name}' is disabled -- enable it first")]
    PowerRequired { name: String },

    #[error("Actuator not found: {name}")]
    ActuatorNotFound { name: String },

    #[error("'{name}' ({kind}) does not support that action")]
    UnsupportedAction { name: String, kind: &'static str },

    #[error("'{name}' has no position '{position}'")]
    UnknownPosition { name: String, position: String },

    // ── Remote command failure ───────────────────────────────────────
    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    // ── Ingestion ────────────────────────────────────────────────────
    #[error("Unknown actuator type '{kind}' for '{name}'")]
    UnknownActuatorKind { name: String, kind: String },

    /// A confirmed state change that does not fit the actuator's kind.
    /// Indicates a dispatcher bug, not an operator mistake.
    #[error("State change does not fit actuator '{name}'")]
    StateMismatch { name: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot reach controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Telemetry link error: {0}")]
    Telemetry(String),

    #[error("Panel is not connected")]
    PanelDisconnected,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` when the command was rejected locally, before any
    /// network call was made. The shadow store is untouched and the
    /// operator can act on the message directly.
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            Self::Locked
                | Self::Busy { .. }
                | Self::PowerRequired { .. }
                | Self::ActuatorNotFound { .. }
                | Self::UnsupportedAction { .. }
                | Self::UnknownPosition { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<novaground_api::Error> for CoreError {
    fn from(err: novaground_api::Error) -> Self {
        match err {
            novaground_api::Error::CommandFailed { status } => CoreError::CommandFailed {
                message: format!("controller answered HTTP {status}"),
            },
            novaground_api::Error::Transport(ref e) if e.is_connect() => {
                CoreError::ConnectionFailed {
                    url: e
                        .url()
                        .map(|u| u.to_string())
                        .unwrap_or_else(|| "<unknown>".into()),
                    reason: e.to_string(),
                }
            }
            novaground_api::Error::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            novaground_api::Error::UnexpectedStatus { endpoint, status } => CoreError::Api {
                message: format!("unexpected response from {endpoint}"),
                status: Some(status),
            },
            novaground_api::Error::WebSocketConnect(message) => CoreError::Telemetry(message),
            novaground_api::Error::Deserialization { message, .. } => CoreError::Api {
                message,
                status: None,
            },
            novaground_api::Error::InvalidUrl(e) => CoreError::Internal(format!("invalid URL: {e}")),
        }
    }
}
