//! Screener errors

use thiserror::Error;

/// Errors from screener configuration
#[derive(Debug, Error)]
pub enum ScreenerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for screener operations
pub type ScreenerResult<T> = Result<T, ScreenerError>;
