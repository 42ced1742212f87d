//! Group-weighted, variance-safe standardization

use serde::{Deserialize, Serialize};
use strum::Display;
use tollgate_core::{FeatureVector, FEATURE_COUNT};

use crate::config::ScreenerConfig;

/// Replacement for infinite inputs
const INF_REPLACEMENT: f64 = 1e10;

/// Semantic feature group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureGroup {
    AmountShape,
    Frequency,
    Timing,
}

impl FeatureGroup {
    /// Group of the feature at `index` in `FEATURE_NAMES` order
    pub fn of(index: usize) -> Self {
        match index {
            0 | 9 => FeatureGroup::Frequency,
            8 | 10..=13 => FeatureGroup::Timing,
            _ => FeatureGroup::AmountShape,
        }
    }

    pub fn multiplier(self, config: &ScreenerConfig) -> f64 {
        match self {
            FeatureGroup::AmountShape => config.amount_weight,
            FeatureGroup::Frequency => config.frequency_weight,
            FeatureGroup::Timing => config.timing_weight,
        }
    }
}

/// Flatten a vector, mapping NaN to 0 and infinities to +-1e10
pub fn sanitize(vector: &FeatureVector) -> [f64; FEATURE_COUNT] {
    vector.to_array().map(|x| {
        if x.is_nan() {
            0.0
        } else if x.is_infinite() {
            INF_REPLACEMENT.copysign(x)
        } else {
            x
        }
    })
}

/// Per-feature population statistics and effective weights
#[derive(Debug, Clone)]
pub struct Standardizer {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
    weight: [f64; FEATURE_COUNT],
}

impl Standardizer {
    /// Fit on sanitized rows
    ///
    /// A feature whose population std is below `variance_epsilon` gets weight
    /// 0 and scale 1, so it contributes nothing instead of an exploding z.
    pub fn fit(rows: &[[f64; FEATURE_COUNT]], config: &ScreenerConfig) -> Self {
        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];
        let mut weight = [0.0; FEATURE_COUNT];

        if rows.is_empty() {
            return Self {
                mean,
                scale,
                weight,
            };
        }
        let n = rows.len() as f64;

        for j in 0..FEATURE_COUNT {
            let m = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - m).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();

            mean[j] = m;
            if std.is_finite() && std >= config.variance_epsilon {
                scale[j] = std;
                weight[j] = FeatureGroup::of(j).multiplier(config);
            }
        }

        Self {
            mean,
            scale,
            weight,
        }
    }

    /// Standardized, group-weighted row
    pub fn transform(&self, row: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        std::array::from_fn(|j| {
            if self.weight[j] == 0.0 {
                0.0
            } else {
                (row[j] - self.mean[j]) / self.scale[j] * self.weight[j]
            }
        })
    }

    /// Effective weight of each feature (0 for near-constant features)
    pub fn weights(&self) -> &[f64; FEATURE_COUNT] {
        &self.weight
    }
}
