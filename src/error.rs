use std::sync::Arc;
use thiserror::Error;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    /// Upstream unreachable, connection reset or timed out.
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("Upstream rejected {endpoint}: status={status}")]
    UpstreamRejected {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// Upstream answered 2xx but the body could not be used.
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },

    #[error("Not logged in: no usable credentials")]
    NotAuthenticated,

    #[error("URL codec error: {0}")]
    Codec(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// One failure handed to every caller that waited on the same attempt.
    #[error("{0}")]
    Shared(Arc<RelayError>),
}

impl RelayError {
    /// Whether repeating the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RelayError::Shared(inner) => inner.is_transient(),
            RelayError::Transport(_) => true,
            RelayError::UpstreamRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the error means the session itself is unusable.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            RelayError::Shared(inner) => inner.is_auth_failure(),
            RelayError::NotAuthenticated => true,
            RelayError::UpstreamRejected { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;
