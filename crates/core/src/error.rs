//! Errors reported by the rule and entitlement collaborators.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching a rule set or entitlement document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection error (network failure, DNS resolution, etc.).
    #[error("connection error: {0}")]
    Connection(String),

    /// HTTP error with status code.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Response deserialization error.
    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    /// Collaborator configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The collaborator did not answer in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The document is not available from this source.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Returns `true` if this error is retryable.
    ///
    /// Connection errors, timeouts and HTTP 5xx errors return `true`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Deserialization(_) | Self::Configuration(_) | Self::Unavailable(_) => false,
        }
    }
}
