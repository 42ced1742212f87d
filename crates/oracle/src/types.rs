//! Core oracle types

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tollgate_core::{ExemplarSet, Transaction};

use crate::OracleError;

/// Extra context for an affiliated (colluding) judge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeammateContext {
    /// Fraction of the teammate's mandate already moved
    pub progress_ratio: f64,
    /// Outstanding mandate amount
    pub remaining: f64,
}

/// Auxiliary context attached to a judgment request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgmentContext {
    /// Current simulated minute
    pub now: u32,
    /// Minutes between the subject's first and last transfer
    pub survival_minutes: u32,
    /// Present only when the judge is affiliated with the subject
    pub teammate: Option<TeammateContext>,
}

/// Everything a judge may look at
///
/// Never carries ground truth.
#[derive(Debug, Clone)]
pub struct JudgmentRequest {
    pub history: Vec<Transaction>,
    pub exemplars: Arc<ExemplarSet>,
    pub context: JudgmentContext,
}

impl JudgmentRequest {
    pub fn new(history: Vec<Transaction>, exemplars: Arc<ExemplarSet>, now: u32) -> Self {
        let survival_minutes = match (history.first(), history.last()) {
            (Some(first), Some(last)) => last.time.saturating_sub(first.time),
            _ => 0,
        };
        Self {
            history,
            exemplars,
            context: JudgmentContext {
                now,
                survival_minutes,
                teammate: None,
            },
        }
    }

    pub fn with_teammate(mut self, teammate: TeammateContext) -> Self {
        self.context.teammate = Some(teammate);
        self
    }
}

/// A verdict with its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    /// `true` = ban
    pub verdict: bool,
    pub rationale: String,
}

impl Judgment {
    pub fn ban(rationale: impl Into<String>) -> Self {
        Self {
            verdict: true,
            rationale: rationale.into(),
        }
    }

    pub fn pass(rationale: impl Into<String>) -> Self {
        Self {
            verdict: false,
            rationale: rationale.into(),
        }
    }
}

/// Judgment Oracle interface
///
/// Implementations may be slow or fail; callers wrap them in a
/// [`RetryPolicy`](crate::RetryPolicy).
#[async_trait]
pub trait JudgmentOracle: Send + Sync {
    async fn judge(&self, request: &JudgmentRequest) -> Result<Judgment, OracleError>;

    /// Backend name for logs
    fn name(&self) -> &str {
        "oracle"
    }
}
