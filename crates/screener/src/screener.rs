//! Population Anomaly Screener
//!
//! A screener is trained from scratch over the live population each audit
//! cycle and then scores vectors with a signed decision value: negative means
//! anomalous. Populations below `min_training_size` yield an untrained
//! screener that flags nobody.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use tollgate_core::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

use crate::config::ScreenerConfig;
use crate::forest::IsolationForest;
use crate::standardize::{sanitize, Standardizer};

/// Number of features listed per diagnosis
const DIAGNOSIS_FEATURES: usize = 3;

#[derive(Debug, Clone)]
struct Model {
    standardizer: Standardizer,
    forest: IsolationForest,
    offset: f64,
}

impl Model {
    fn decision(&self, vector: &FeatureVector) -> f64 {
        let row = self.standardizer.transform(&sanitize(vector));
        self.forest.score_sample(&row) - self.offset
    }
}

/// Explanation of one anomalous row
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    /// Index into the scored population
    pub index: usize,
    pub decision: f64,
    /// Features with the largest weighted |z|, largest first
    pub top_features: Vec<(&'static str, f64)>,
}

/// Trained (or degenerate) outlier model
#[derive(Debug, Clone)]
pub struct Screener {
    model: Option<Model>,
    config: ScreenerConfig,
}

impl Screener {
    /// A screener that scores everyone 0 and flags nobody
    pub fn untrained(config: &ScreenerConfig) -> Self {
        Self {
            model: None,
            config: config.clone(),
        }
    }

    /// Train over the current population
    pub fn train(population: &[FeatureVector], config: &ScreenerConfig) -> Self {
        if population.len() < config.min_training_size {
            debug!(
                population = population.len(),
                min = config.min_training_size,
                "Population too small, screener left untrained"
            );
            return Self::untrained(config);
        }

        let rows: Vec<[f64; FEATURE_COUNT]> = population.iter().map(sanitize).collect();
        let standardizer = Standardizer::fit(&rows, config);
        let transformed: Vec<[f64; FEATURE_COUNT]> =
            rows.iter().map(|r| standardizer.transform(r)).collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let forest = IsolationForest::fit(&transformed, config.n_trees, config.max_samples, &mut rng);

        let scores: Vec<f64> = transformed.iter().map(|r| forest.score_sample(r)).collect();
        let offset = quantile(&scores, config.contamination);

        let active = standardizer.weights().iter().filter(|w| **w > 0.0).count();
        debug!(
            population = population.len(),
            trees = forest.len(),
            active_features = active,
            offset,
            "Screener trained"
        );

        Self {
            model: Some(Model {
                standardizer,
                forest,
                offset,
            }),
            config: config.clone(),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Decision threshold subtracted from raw scores
    pub fn offset(&self) -> Option<f64> {
        self.model.as_ref().map(|m| m.offset)
    }

    /// Signed decision value; negative means anomalous
    pub fn score(&self, vector: &FeatureVector) -> f64 {
        match &self.model {
            Some(model) => model.decision(vector),
            None => 0.0,
        }
    }

    pub fn score_batch(&self, vectors: &[FeatureVector]) -> Vec<f64> {
        vectors.iter().map(|v| self.score(v)).collect()
    }

    /// Indices of vectors with a negative decision
    pub fn flag(&self, vectors: &[FeatureVector]) -> Vec<usize> {
        let scores = self.score_batch(vectors);
        let flagged: Vec<usize> = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| **s < 0.0)
            .map(|(i, _)| i)
            .collect();

        if !flagged.is_empty() {
            for diagnosis in self.diagnose_scored(vectors, &scores) {
                debug!(
                    index = diagnosis.index,
                    decision = diagnosis.decision,
                    top = ?diagnosis.top_features,
                    "Anomaly diagnosis"
                );
            }
        }
        flagged
    }

    /// Explain the `diagnosis_top_n` most anomalous vectors
    pub fn diagnose(&self, vectors: &[FeatureVector]) -> Vec<Diagnosis> {
        let scores = self.score_batch(vectors);
        self.diagnose_scored(vectors, &scores)
    }

    fn diagnose_scored(&self, vectors: &[FeatureVector], scores: &[f64]) -> Vec<Diagnosis> {
        let Some(model) = &self.model else {
            return Vec::new();
        };

        let mut order: Vec<usize> = (0..vectors.len()).collect();
        order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));

        order
            .into_iter()
            .take(self.config.diagnosis_top_n)
            .map(|index| {
                let z = model.standardizer.transform(&sanitize(&vectors[index]));
                let mut features: Vec<(&'static str, f64)> =
                    FEATURE_NAMES.iter().copied().zip(z).collect();
                features.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
                features.truncate(DIAGNOSIS_FEATURES);

                Diagnosis {
                    index,
                    decision: scores[index],
                    top_features: features,
                }
            })
            .collect()
    }
}

/// Linearly interpolated quantile, `q` in `[0, 1]`
fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}
