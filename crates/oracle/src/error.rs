//! Oracle error types

use thiserror::Error;

/// Judgment Oracle failures
#[derive(Debug, Error)]
pub enum OracleError {
    /// Call did not complete in time
    #[error("Oracle call timed out after {0}ms")]
    Timeout(u64),

    /// Backend refused the call due to rate limiting
    #[error("Oracle rate limited")]
    RateLimited,

    /// Generic backend failure, worth retrying
    #[error("Transient oracle failure: {0}")]
    Transient(String),

    /// Backend answered with something that is not a verdict
    #[error("Malformed oracle response: {0}")]
    Malformed(String),
}

impl OracleError {
    /// Whether a retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OracleError::Timeout(_) | OracleError::RateLimited | OracleError::Transient(_)
        )
    }
}
