//! Committee and reputation configuration

use serde::{Deserialize, Serialize};
use tollgate_oracle::{FailPolicy, RetryPolicy, SuspicionRule};

use crate::error::{CommitteeError, CommitteeResult};

/// Configuration for Committee Consensus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeConfig {
    /// Members per committee (k)
    #[serde(default = "default_size")]
    pub size: usize,

    /// Ban iff ban votes > quorum_ratio * k
    #[serde(default = "default_quorum_ratio")]
    pub quorum_ratio: f64,

    /// Maximum concurrent votes within one review
    #[serde(default = "default_vote_concurrency")]
    pub vote_concurrency: usize,

    /// Maximum reviews voting at once across the engine
    #[serde(default = "default_review_concurrency")]
    pub review_concurrency: usize,

    /// Outstanding mandate above which colluders ban their own affiliate
    #[serde(default = "default_collusion_task_threshold")]
    pub collusion_task_threshold: f64,

    /// Vote of an honest member whose oracle stays unreachable
    #[serde(default = "default_honest_fallback")]
    pub honest_fallback: FailPolicy,

    /// Vote of a colluding member whose oracle stays unreachable
    #[serde(default = "default_colluding_fallback")]
    pub colluding_fallback: FailPolicy,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Rule used by rule-based members
    #[serde(default)]
    pub rule: SuspicionRule,
}

fn default_size() -> usize {
    10
}

fn default_quorum_ratio() -> f64 {
    0.5
}

fn default_vote_concurrency() -> usize {
    3
}

fn default_review_concurrency() -> usize {
    3
}

fn default_collusion_task_threshold() -> f64 {
    8000.0
}

fn default_honest_fallback() -> FailPolicy {
    FailPolicy::FailOpen
}

fn default_colluding_fallback() -> FailPolicy {
    FailPolicy::FailClosed
}

impl Default for CommitteeConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            quorum_ratio: default_quorum_ratio(),
            vote_concurrency: default_vote_concurrency(),
            review_concurrency: default_review_concurrency(),
            collusion_task_threshold: default_collusion_task_threshold(),
            honest_fallback: default_honest_fallback(),
            colluding_fallback: default_colluding_fallback(),
            retry: RetryPolicy::default(),
            rule: SuspicionRule::default(),
        }
    }
}

impl CommitteeConfig {
    pub fn validate(&self) -> CommitteeResult<()> {
        if self.size == 0 {
            return Err(CommitteeError::ConfigError(
                "committee size must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.quorum_ratio) {
            return Err(CommitteeError::ConfigError(format!(
                "quorum_ratio must be in [0, 1), got {}",
                self.quorum_ratio
            )));
        }
        if self.vote_concurrency == 0 {
            return Err(CommitteeError::ConfigError(
                "vote_concurrency must be > 0".into(),
            ));
        }
        if self.review_concurrency == 0 {
            return Err(CommitteeError::ConfigError(
                "review_concurrency must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Minimum ban votes for a ban verdict with `k` members
    pub fn quorum(&self, k: usize) -> usize {
        (self.quorum_ratio * k as f64).floor() as usize + 1
    }
}

/// Configuration for the Reputation/Weight Updater
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Initial reputation and weight-scaling floor; must be > 0
    #[serde(default = "default_rep_base")]
    pub rep_base: f64,

    #[serde(default = "default_weight_base")]
    pub weight_base: f64,

    #[serde(default = "default_weight_upper")]
    pub weight_upper: f64,

    /// Blend weight of consistency with the committee decision
    #[serde(default = "default_consistency_weight")]
    pub consistency_weight: f64,

    /// Blend weight of accuracy against ground truth
    #[serde(default = "default_accuracy_weight")]
    pub accuracy_weight: f64,

    /// Share of the previous reputation carried into the next period
    #[serde(default = "default_decay")]
    pub decay: f64,
}

fn default_rep_base() -> f64 {
    1.0
}

fn default_weight_base() -> f64 {
    1000.0
}

fn default_weight_upper() -> f64 {
    2000.0
}

fn default_consistency_weight() -> f64 {
    0.25
}

fn default_accuracy_weight() -> f64 {
    0.5
}

fn default_decay() -> f64 {
    0.5
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            rep_base: default_rep_base(),
            weight_base: default_weight_base(),
            weight_upper: default_weight_upper(),
            consistency_weight: default_consistency_weight(),
            accuracy_weight: default_accuracy_weight(),
            decay: default_decay(),
        }
    }
}

impl ReputationConfig {
    pub fn validate(&self) -> CommitteeResult<()> {
        if !(self.rep_base.is_finite() && self.rep_base > 0.0) {
            return Err(CommitteeError::ConfigError(format!(
                "rep_base must be > 0, got {}",
                self.rep_base
            )));
        }
        if !(self.weight_base.is_finite() && self.weight_base > 0.0) {
            return Err(CommitteeError::ConfigError(format!(
                "weight_base must be > 0, got {}",
                self.weight_base
            )));
        }
        if !(self.weight_upper.is_finite() && self.weight_upper >= self.weight_base) {
            return Err(CommitteeError::ConfigError(
                "weight_upper must be >= weight_base".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CommitteeConfig::default();
        assert_eq!(config.size, 10);
        assert_eq!(config.quorum_ratio, 0.5);
        assert_eq!(config.collusion_task_threshold, 8000.0);
        assert_eq!(config.honest_fallback, FailPolicy::FailOpen);
        assert_eq!(config.colluding_fallback, FailPolicy::FailClosed);
        assert!(config.validate().is_ok());

        let rep = ReputationConfig::default();
        assert_eq!(rep.weight_base, 1000.0);
        assert_eq!(rep.weight_upper, 2000.0);
        assert!(rep.validate().is_ok());
    }

    #[test]
    fn test_quorum_is_strict_majority() {
        let config = CommitteeConfig::default();
        assert_eq!(config.quorum(10), 6);
        assert_eq!(config.quorum(9), 5);
        assert_eq!(config.quorum(1), 1);

        let lenient = CommitteeConfig {
            quorum_ratio: 0.3,
            ..Default::default()
        };
        assert_eq!(lenient.quorum(10), 4);
    }

    #[test]
    fn test_non_positive_rep_base_rejected() {
        let config = ReputationConfig {
            rep_base: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CommitteeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_zero_size_rejected() {
        let config = CommitteeConfig {
            size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_review_concurrency_rejected() {
        assert_eq!(CommitteeConfig::default().review_concurrency, 3);

        let config = CommitteeConfig {
            review_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CommitteeError::ConfigError(_))
        ));
    }
}
