//! Deterministic suspicion rule
//!
//! Scores the last `window_minutes` of an actor's own history:
//! - activity ratio (distinct active minutes / elapsed minutes in window)
//! - intensity (transfers per active minute)

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tollgate_core::Transaction;

use crate::error::OracleError;
use crate::types::{Judgment, JudgmentOracle, JudgmentRequest};

/// Maximum suspicion score
const MAX_SCORE: f64 = 10.0;

/// Windowed activity/intensity rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspicionRule {
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,

    /// Score at or above which the rule votes to ban
    #[serde(default = "default_ban_threshold")]
    pub ban_threshold: f64,
}

fn default_window_minutes() -> u32 {
    60
}

fn default_ban_threshold() -> f64 {
    3.0
}

impl Default for SuspicionRule {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            ban_threshold: default_ban_threshold(),
        }
    }
}

impl SuspicionRule {
    /// Suspicion score in `[0, 10]`
    pub fn score(&self, history: &[Transaction], now: u32) -> f64 {
        let cutoff = now.saturating_sub(self.window_minutes);
        let recent: Vec<&Transaction> = history.iter().filter(|t| t.time >= cutoff).collect();
        if recent.is_empty() {
            return 0.0;
        }

        let active_minutes = recent.iter().map(|t| t.time).collect::<HashSet<_>>().len();
        let elapsed = now.min(self.window_minutes).max(1);

        let ratio = active_minutes as f64 / f64::from(elapsed);
        let intensity = recent.len() as f64 / active_minutes as f64;

        let mut score: f64 = 0.0;
        if ratio >= 0.7 {
            score += 6.0;
        } else if ratio >= 0.4 {
            score += 4.0;
        }
        if intensity >= 3.0 {
            score += 4.0;
        } else if intensity >= 2.0 {
            score += 2.0;
        }
        score.min(MAX_SCORE)
    }

    /// `true` = ban
    pub fn verdict(&self, history: &[Transaction], now: u32) -> bool {
        self.score(history, now) >= self.ban_threshold
    }
}

/// Oracle backed by [`SuspicionRule`]; never fails
#[derive(Debug, Clone, Default)]
pub struct RuleOracle {
    rule: SuspicionRule,
}

impl RuleOracle {
    pub fn new(rule: SuspicionRule) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl JudgmentOracle for RuleOracle {
    async fn judge(&self, request: &JudgmentRequest) -> Result<Judgment, OracleError> {
        let now = request.context.now;
        let score = self.rule.score(&request.history, now);
        let rationale = format!(
            "suspicion score {:.1} over last {} minutes (threshold {:.1})",
            score, self.rule.window_minutes, self.rule.ban_threshold
        );
        Ok(Judgment {
            verdict: score >= self.rule.ban_threshold,
            rationale,
        })
    }

    fn name(&self) -> &str {
        "rule"
    }
}
