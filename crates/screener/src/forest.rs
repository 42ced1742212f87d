//! Isolation forest
//!
//! Anomalies are isolated by fewer random axis-aligned splits, so a short
//! average path length means an outlier. Scores follow the usual convention:
//! `score = -2^(-E[h] / c(psi))`, in `[-1, 0]`, lower is more anomalous.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;

use tollgate_core::FEATURE_COUNT;

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_9;

type Row = [f64; FEATURE_COUNT];

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn build(rows: &[&Row], depth: usize, limit: usize, rng: &mut StdRng) -> Self {
        if depth >= limit || rows.len() <= 1 {
            return Node::Leaf { size: rows.len() };
        }

        // Only features that actually vary within this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
            .filter_map(|j| {
                let (lo, hi) = rows
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                        (lo.min(r[j]), hi.max(r[j]))
                    });
                (hi > lo).then_some((j, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            return Node::Leaf { size: rows.len() };
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        // lo always goes left and hi always goes right, so neither side is empty
        let (left, right): (Vec<&Row>, Vec<&Row>) =
            rows.iter().copied().partition(|r| r[feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Node::build(&left, depth + 1, limit, rng)),
            right: Box::new(Node::build(&right, depth + 1, limit, rng)),
        }
    }

    fn path_length(&self, row: &Row) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { &**left } else { &**right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Ensemble of isolation trees
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit `n_trees` trees, each on `min(max_samples, n)` rows drawn without
    /// replacement
    pub fn fit(rows: &[Row], n_trees: usize, max_samples: usize, rng: &mut StdRng) -> Self {
        let sample_size = max_samples.min(rows.len());
        let limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<&Row> = index::sample(rng, rows.len(), sample_size)
                    .into_iter()
                    .map(|i| &rows[i])
                    .collect();
                Node::build(&sample, 0, limit, rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Mean path length across trees
    pub fn expected_depth(&self, row: &Row) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Raw score in `[-1, 0]`; lower is more anomalous
    pub fn score_sample(&self, row: &Row) -> f64 {
        let c = average_path_length(self.sample_size);
        if c <= 0.0 {
            return -1.0;
        }
        -(2f64.powf(-self.expected_depth(row) / c))
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
