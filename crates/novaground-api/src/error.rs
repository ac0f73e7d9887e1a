use thiserror::Error;

/// Top-level error type for the `novaground-api` crate.
///
/// Covers the transport failure modes across both surfaces: the HTTP
/// command/catalogue endpoints and the WebSocket telemetry channel.
/// `novaground-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing or construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Command endpoint ────────────────────────────────────────────
    /// The controller answered `/send_command` with a non-200 status.
    /// Anything other than a plain 200 counts as failure.
    #[error("Command rejected by controller (HTTP {status})")]
    CommandFailed { status: u16 },

    /// A read endpoint answered with an unexpected status.
    #[error("Unexpected response from {endpoint} (HTTP {status})")]
    UnexpectedStatus { endpoint: &'static str, status: u16 },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed or dropped with an error.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error came back from the command endpoint
    /// (as opposed to never reaching the controller at all).
    pub fn is_command_rejection(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}
