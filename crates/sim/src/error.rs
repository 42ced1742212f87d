//! Simulator errors

use thiserror::Error;
use tollgate_committee::CommitteeError;
use tollgate_core::CoreError;
use tollgate_screener::ScreenerError;
use tollgate_stats::StatsError;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Committee error: {0}")]
    CommitteeError(#[from] CommitteeError),

    #[error("Screener error: {0}")]
    ScreenerError(#[from] ScreenerError),

    #[error("Core error: {0}")]
    CoreError(#[from] CoreError),

    #[error("Stats error: {0}")]
    StatsError(#[from] StatsError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    TaskError(String),
}

pub type SimResult<T> = Result<T, SimError>;
