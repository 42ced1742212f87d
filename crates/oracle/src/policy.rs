//! Retry and fallback policies for oracle calls

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::warn;

use crate::error::OracleError;
use crate::types::{Judgment, JudgmentOracle, JudgmentRequest};

/// Verdict used when the oracle cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailPolicy {
    /// Treat the subject as suspicious (ban)
    #[default]
    FailClosed,

    /// Let the subject through (pass)
    FailOpen,
}

impl FailPolicy {
    /// `true` = ban
    pub fn verdict(self) -> bool {
        matches!(self, FailPolicy::FailClosed)
    }

    /// Substitute judgment after retries are exhausted
    pub fn fallback(self, error: &OracleError) -> Judgment {
        Judgment {
            verdict: self.verdict(),
            rationale: format!("fallback ({}) after oracle failure: {}", self, error),
        }
    }
}

/// Fixed-backoff retry with a bounded attempt count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    60_000 // 1 minute
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff_ms: backoff.as_millis() as u64,
        }
    }

    /// No waiting between attempts (tests and local rule oracles)
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        backoff_ms = self.backoff_ms,
                        error = %e,
                        "Oracle call failed, retrying"
                    );
                    if !self.backoff().is_zero() {
                        tokio::time::sleep(self.backoff()).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Judge with retries
    pub async fn judge(
        &self,
        oracle: &dyn JudgmentOracle,
        request: &JudgmentRequest,
    ) -> Result<Judgment, OracleError> {
        self.run(|| oracle.judge(request)).await
    }
}
