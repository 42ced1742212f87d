//! Candidate pool and weighted committee draws

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::candidate::{Candidate, CandidateId, Honesty};
use crate::error::{CommitteeError, CommitteeResult};

/// A committee drawn from the pool
#[derive(Debug, Clone, Default)]
pub struct Committee {
    members: Vec<Arc<Candidate>>,
}

impl Committee {
    pub fn new(members: Vec<Arc<Candidate>>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Arc<Candidate>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.members.iter().any(|m| m.id() == id)
    }

    /// Number of colluding members
    pub fn colluding(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.honesty() == Honesty::Colluding)
            .count()
    }
}

/// The full set of candidates
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: Vec<Arc<Candidate>>,
}

impl CandidatePool {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn candidates(&self) -> &[Arc<Candidate>] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, id: CandidateId) -> Option<&Arc<Candidate>> {
        self.candidates.iter().find(|c| c.id() == id)
    }

    /// Draw `k` distinct members, each step with probability proportional to
    /// weight among those not yet drawn
    ///
    /// Non-finite or negative weights count as zero. If the remaining weight
    /// is not positive the step falls back to a uniform pick.
    pub fn draw<R: Rng>(&self, k: usize, rng: &mut R) -> CommitteeResult<Committee> {
        if k > self.candidates.len() {
            return Err(CommitteeError::InsufficientCandidates {
                requested: k,
                available: self.candidates.len(),
            });
        }

        // Weights are read once per draw
        let mut remaining: Vec<(Arc<Candidate>, f64)> = self
            .candidates
            .iter()
            .map(|c| {
                let w = c.weight();
                (Arc::clone(c), if w.is_finite() && w > 0.0 { w } else { 0.0 })
            })
            .collect();
        let mut members = Vec::with_capacity(k);

        for _ in 0..k {
            // Weighted pick among those left, uniform if no mass remains
            let total: f64 = remaining.iter().map(|(_, w)| w).sum();
            let idx = if total > 0.0 && total.is_finite() {
                pick_weighted(&remaining, rng.gen_range(0.0..total))
            } else {
                rng.gen_range(0..remaining.len())
            };
            // Remove the winner so it cannot be drawn twice
            members.push(remaining.swap_remove(idx).0);
        }

        debug!(
            k,
            pool = self.candidates.len(),
            colluding = members
                .iter()
                .filter(|m| m.honesty() == Honesty::Colluding)
                .count(),
            "Committee drawn"
        );
        Ok(Committee::new(members))
    }
}

/// Index whose cumulative weight first exceeds `target`
fn pick_weighted(items: &[(Arc<Candidate>, f64)], mut target: f64) -> usize {
    let mut last_positive = 0;
    for (i, (_, w)) in items.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        if target < *w {
            return i;
        }
        target -= w;
        last_positive = i;
    }
    // Rounding left target just past the end
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::JudgmentPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn pool(weights: &[f64]) -> CandidatePool {
        CandidatePool::new(
            weights
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    Candidate::new(
                        CandidateId(i as u32),
                        Honesty::Honest,
                        JudgmentPolicy::Rule,
                        *w,
                        1.0,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_oversize_draw_fails() {
        let pool = pool(&[1000.0; 4]);
        let mut rng = StdRng::seed_from_u64(1);

        let result = pool.draw(5, &mut rng);
        assert!(matches!(
            result,
            Err(CommitteeError::InsufficientCandidates {
                requested: 5,
                available: 4
            })
        ));
    }

    #[test]
    fn test_draw_never_repeats() {
        let pool = pool(&[1000.0, 2000.0, 1500.0, 1000.0, 1800.0, 1200.0]);
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..500 {
            let committee = pool.draw(4, &mut rng).unwrap();
            let ids: HashSet<CandidateId> = committee.members().iter().map(|m| m.id()).collect();
            assert_eq!(ids.len(), 4);
        }
        // Drawing the whole pool returns everyone exactly once
        assert_eq!(pool.draw(6, &mut rng).unwrap().len(), 6);
    }

    #[test]
    fn test_single_draw_frequency_matches_weight_share() {
        let weights = [1000.0, 2000.0, 1000.0, 4000.0];
        let total: f64 = weights.iter().sum();
        let pool = pool(&weights);
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 40_000;
        let mut counts = [0usize; 4];
        for _ in 0..trials {
            let committee = pool.draw(1, &mut rng).unwrap();
            counts[committee.members()[0].id().0 as usize] += 1;
        }

        for (i, w) in weights.iter().enumerate() {
            let expected = w / total;
            let observed = counts[i] as f64 / trials as f64;
            assert!(
                (observed - expected).abs() < 0.015,
                "candidate {} observed {} expected {}",
                i,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_heavier_candidates_drawn_more_often() {
        let mut weights = vec![1000.0; 9];
        weights.push(2000.0);
        let pool = pool(&weights);
        let mut rng = StdRng::seed_from_u64(3);

        let mut heavy = 0;
        let mut light = 0;
        for _ in 0..5_000 {
            let committee = pool.draw(3, &mut rng).unwrap();
            if committee.contains(CandidateId(9)) {
                heavy += 1;
            }
            if committee.contains(CandidateId(0)) {
                light += 1;
            }
        }
        assert!(heavy > light);
    }

    #[test]
    fn test_zero_weights_fall_back_to_uniform() {
        let pool = pool(&[0.0, 0.0, f64::NAN]);
        let mut rng = StdRng::seed_from_u64(5);

        let committee = pool.draw(3, &mut rng).unwrap();
        assert_eq!(committee.len(), 3);
    }

    #[test]
    fn test_single_candidate_pool() {
        let pool = pool(&[1000.0]);
        let mut rng = StdRng::seed_from_u64(5);

        let committee = pool.draw(1, &mut rng).unwrap();
        assert!(committee.contains(CandidateId(0)));
        assert!(pool.draw(0, &mut rng).unwrap().is_empty());
    }
}
