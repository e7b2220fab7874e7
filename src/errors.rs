use std::time::Duration;

use thiserror::Error;

/// Top-level client error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Connection errors ────────────────────────────────────────────────────
    #[error("No identity available: log in before connecting")]
    Authentication,

    #[error("Connection was not established within {after:?}")]
    ConnectionTimeout { after: Duration },

    #[error("Not connected: call connect() before sending")]
    NotConnected,

    #[error("Connection attempt cancelled by close()")]
    Closed,

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Malformed frame: {message}")]
    Protocol { message: String },

    // ── HTTP API errors ──────────────────────────────────────────────────────
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("A reply is still streaming")]
    TurnInProgress,

    // ── Coach agent errors ───────────────────────────────────────────────────
    #[error("Coach model service unavailable at {host}")]
    CoachUnavailable { host: String },

    #[error("Model '{model_name}' not found")]
    ModelNotFound { model_name: String },

    #[error("Inference error: {message}")]
    Inference { message: String },

    // ── Local storage errors ─────────────────────────────────────────────────
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ClientError::Storage { message: message.into() }
    }

    /// Errors that a reconnect (or a fresh `connect()`) may resolve.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionTimeout { .. }
                | ClientError::NotConnected
                | ClientError::Closed
                | ClientError::Transport { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::EmptyMessage | ClientError::TurnInProgress)
    }

    pub fn is_coach_unavailable(&self) -> bool {
        matches!(self, ClientError::CoachUnavailable { .. })
    }
}
