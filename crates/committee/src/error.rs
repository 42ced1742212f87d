//! Committee errors

use thiserror::Error;

/// Errors from committee configuration and draws
#[derive(Debug, Error)]
pub enum CommitteeError {
    #[error("Insufficient candidates: requested {requested}, pool has {available}")]
    InsufficientCandidates { requested: usize, available: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for committee operations
pub type CommitteeResult<T> = Result<T, CommitteeError>;
