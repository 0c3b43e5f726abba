//! Fetch error types.

use armory_core::{CoreError, ErrorKind};
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
///
/// Payloads are plain strings so the error is `Clone`; a failed token
/// refresh is handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Credentials rejected or token invalid after one refresh.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limit still exceeded after bounded retries.
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded {
        /// Total attempts made, including the first.
        attempts: u32,
    },

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Schema(String),

    /// Network failure, timeout or server error after bounded retries.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    /// Invalid configuration (region, credentials, entity/tier mismatch).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// Classifies this error for metric records.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns true for errors that a later attempt may resolve.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::Unavailable(_)
        )
    }
}

impl From<CoreError> for FetchError {
    fn from(err: CoreError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Schema(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Schema(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}
