//! Screener configuration
//!
//! Group multipliers reflect that amount shape and timing matter more to the
//! detector than raw transaction count.

use serde::{Deserialize, Serialize};

use crate::error::{ScreenerError, ScreenerResult};

/// Configuration for the Population Anomaly Screener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerConfig {
    // === Feature groups ===
    /// Multiplier for amount-shape features (value_*, amount_*, pct_*)
    #[serde(default = "default_amount_weight")]
    pub amount_weight: f64,

    /// Multiplier for frequency features (total_tx, tx_per_hour)
    #[serde(default = "default_frequency_weight")]
    pub frequency_weight: f64,

    /// Multiplier for timing features (time_span_hours, *_interval)
    #[serde(default = "default_timing_weight")]
    pub timing_weight: f64,

    /// Population std below which a feature is weighted to zero
    #[serde(default = "default_variance_epsilon")]
    pub variance_epsilon: f64,

    // === Isolation forest ===
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Rows per tree (capped at the population size)
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Expected share of anomalies; sets the decision offset
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Below this population size nobody is flagged
    #[serde(default = "default_min_training_size")]
    pub min_training_size: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of most anomalous rows to explain in debug logs
    #[serde(default = "default_diagnosis_top_n")]
    pub diagnosis_top_n: usize,
}

fn default_amount_weight() -> f64 {
    0.8
}

fn default_frequency_weight() -> f64 {
    0.9
}

fn default_timing_weight() -> f64 {
    1.3
}

fn default_variance_epsilon() -> f64 {
    1e-9
}

fn default_n_trees() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

fn default_contamination() -> f64 {
    0.002
}

fn default_min_training_size() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

fn default_diagnosis_top_n() -> usize {
    5
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            amount_weight: default_amount_weight(),
            frequency_weight: default_frequency_weight(),
            timing_weight: default_timing_weight(),
            variance_epsilon: default_variance_epsilon(),
            n_trees: default_n_trees(),
            max_samples: default_max_samples(),
            contamination: default_contamination(),
            min_training_size: default_min_training_size(),
            seed: default_seed(),
            diagnosis_top_n: default_diagnosis_top_n(),
        }
    }
}

impl ScreenerConfig {
    pub fn validate(&self) -> ScreenerResult<()> {
        if self.n_trees == 0 {
            return Err(ScreenerError::ConfigError("n_trees must be > 0".into()));
        }
        if self.max_samples < 2 {
            return Err(ScreenerError::ConfigError(
                "max_samples must be >= 2".into(),
            ));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ScreenerError::ConfigError(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        let weights = [self.amount_weight, self.frequency_weight, self.timing_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScreenerError::ConfigError(
                "group weights must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}
