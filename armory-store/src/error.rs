//! Store error types.

use std::time::Duration;

use armory_core::{CoreError, FetchTier};
use armory_fetch::FetchError;
use thiserror::Error;

/// Errors that can occur in the coordinator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fetch error outside steady-state polling (e.g. the start-up check).
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A cycle for the tier is already running.
    #[error("Refresh already in progress for {0}")]
    CycleInProgress(FetchTier),

    /// `start` was called twice.
    #[error("Coordinator is already running")]
    AlreadyRunning,

    /// `shutdown` was called on a stopped coordinator.
    #[error("Coordinator is not running")]
    NotRunning,

    /// The cycle was cancelled and its results discarded.
    #[error("Cycle for {0} was cancelled")]
    Cancelled(FetchTier),

    /// Background tasks did not stop in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Returns true if the operation may succeed if tried again later.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Fetch(e) => e.is_transient(),
            StoreError::CycleInProgress(_) | StoreError::Cancelled(_) | StoreError::Timeout(_) => true,
            _ => false,
        }
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        StoreError::Config(err.to_string())
    }
}
