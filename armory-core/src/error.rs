//! Core error types for `Armory Watch`.

use thiserror::Error;

/// Core error type for `Armory Watch` operations.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Region code is not one of the supported regions.
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
