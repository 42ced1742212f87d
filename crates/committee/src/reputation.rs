//! Reputation/Weight Updater
//!
//! Runs once per reputation period, after every review of the period has
//! joined:
//!
//! ```text
//! rep    ← decay·rep + (wc·consistency + wa·accuracy)·rep_base
//! weight ← weight_base + (rep − rep_base)(weight_upper − weight_base)
//!                        / (rep_max − rep_min + rep_base)
//! ```
//!
//! `rep_base > 0` is enforced at construction, so the weight denominator is
//! at least `rep_base` even when every reputation is identical.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::candidate::Standing;
use crate::config::ReputationConfig;
use crate::error::CommitteeResult;
use crate::pool::CandidatePool;
use crate::review::{ReviewLedger, ReviewRecord, ReviewTicket};

/// Summary of one update
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoundUpdate {
    /// Closed reviews in the period
    pub reviews: usize,
    /// Candidates whose reputation was recomputed
    pub updated: usize,
    pub rep_min: f64,
    pub rep_max: f64,
}

#[derive(Debug, Clone)]
pub struct ReputationUpdater {
    config: ReputationConfig,
}

impl ReputationUpdater {
    pub fn new(config: ReputationConfig) -> CommitteeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    /// Recompute reputations and weights from the period's reviews, then
    /// clear vote histories and the ledger
    ///
    /// With no closed reviews nothing changes.
    pub fn update_round(&self, pool: &CandidatePool, ledger: &ReviewLedger) -> RoundUpdate {
        let reviews: HashMap<ReviewTicket, ReviewRecord> = ledger.closed().into_iter().collect();
        if reviews.is_empty() {
            debug!("No reviews this period, reputations unchanged");
            for candidate in pool.candidates() {
                candidate.clear_votes();
            }
            ledger.clear();
            return RoundUpdate::default();
        }

        let cfg = &self.config;
        let mut updated = 0;
        let mut reputations = Vec::with_capacity(pool.len());

        for candidate in pool.candidates() {
            let votes: Vec<(bool, ReviewRecord)> = candidate
                .cast_votes()
                .into_iter()
                .filter_map(|v| reviews.get(&v.review).map(|r| (v.ban, *r)))
                .collect();

            let mut rep = candidate.reputation();
            if !votes.is_empty() {
                let n = votes.len() as f64;
                let consistency = votes.iter().filter(|(ban, r)| *ban == r.decision).count() as f64 / n;
                let accuracy = votes.iter().filter(|(ban, r)| *ban == r.truth).count() as f64 / n;
                rep = cfg.decay * rep
                    + (cfg.consistency_weight * consistency + cfg.accuracy_weight * accuracy)
                        * cfg.rep_base;
                updated += 1;
            }
            reputations.push(rep);
        }

        let rep_min = reputations.iter().copied().fold(f64::INFINITY, f64::min);
        let rep_max = reputations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let denominator = (rep_max - rep_min).max(0.0) + cfg.rep_base;
        let span = cfg.weight_upper - cfg.weight_base;

        for (candidate, reputation) in pool.candidates().iter().zip(reputations) {
            let weight = (cfg.weight_base + (reputation - cfg.rep_base) * span / denominator)
                .clamp(cfg.weight_base, cfg.weight_upper);
            candidate.set_standing(Standing { weight, reputation });
            candidate.clear_votes();
        }
        ledger.clear();

        info!(
            reviews = reviews.len(),
            updated,
            rep_min,
            rep_max,
            "Reputations updated"
        );
        RoundUpdate {
            reviews: reviews.len(),
            updated,
            rep_min,
            rep_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Candidate, CandidateId, Honesty, JudgmentPolicy};

    fn pool(n: u32) -> CandidatePool {
        CandidatePool::new(
            (0..n)
                .map(|i| Candidate::new(CandidateId(i), Honesty::Honest, JudgmentPolicy::Rule, 1000.0, 1.0))
                .collect(),
        )
    }

    fn updater() -> ReputationUpdater {
        ReputationUpdater::new(ReputationConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_history_is_noop() {
        let pool = pool(4);
        let ledger = ReviewLedger::new();
        let before: Vec<Standing> = pool.candidates().iter().map(|c| c.standing()).collect();

        let update = updater().update_round(&pool, &ledger);
        let after: Vec<Standing> = pool.candidates().iter().map(|c| c.standing()).collect();

        assert_eq!(update.updated, 0);
        assert_eq!(before, after);

        // Twice in a row is still a no-op
        updater().update_round(&pool, &ledger);
        let again: Vec<Standing> = pool.candidates().iter().map(|c| c.standing()).collect();
        assert_eq!(before, again);
    }

    #[test]
    fn test_identical_reputations_stay_finite() {
        let pool = pool(3);
        let ledger = ReviewLedger::new();
        let ticket = ledger.open();
        for c in pool.candidates() {
            c.record_vote(ticket, true);
        }
        ledger.close(ticket, true, true);

        let update = updater().update_round(&pool, &ledger);

        assert_eq!(update.updated, 3);
        assert_eq!(update.rep_min, update.rep_max);
        for c in pool.candidates() {
            let s = c.standing();
            // 0.5 * 1 + (0.25 + 0.5) * 1
            assert!((s.reputation - 1.25).abs() < 1e-12);
            assert!(s.weight.is_finite());
            // 1000 + 0.25 * 1000 / (0 + 1)
            assert!((s.weight - 1250.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_accurate_voters_gain_weight() {
        let pool = pool(3);
        let ledger = ReviewLedger::new();

        for truth in [true, false, true, true] {
            let ticket = ledger.open();
            let candidates = pool.candidates();
            candidates[0].record_vote(ticket, truth);
            candidates[1].record_vote(ticket, !truth);
            // candidates[2] never sits on a committee
            ledger.close(ticket, truth, truth);
        }

        let update = updater().update_round(&pool, &ledger);
        let c = pool.candidates();

        assert_eq!(update.reviews, 4);
        assert_eq!(update.updated, 2);
        assert!(c[0].weight() > c[1].weight());
        // Non-voter keeps its reputation
        assert_eq!(c[2].reputation(), 1.0);
        assert!(c.iter().all(|x| (1000.0..=2000.0).contains(&x.weight())));
        assert!(c.iter().all(|x| x.cast_votes().is_empty()));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_votes_for_unclosed_reviews_ignored() {
        let pool = pool(1);
        let ledger = ReviewLedger::new();
        let closed = ledger.open();
        let dangling = ledger.open();
        let c = &pool.candidates()[0];
        c.record_vote(closed, true);
        c.record_vote(dangling, false);
        ledger.close(closed, true, true);

        updater().update_round(&pool, &ledger);
        assert!((c.reputation() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_weights_clamped() {
        let pool = pool(2);
        let ledger = ReviewLedger::new();
        let ticket = ledger.open();
        let c = pool.candidates();
        c[0].record_vote(ticket, true);
        c[1].record_vote(ticket, false);
        ledger.close(ticket, true, true);

        updater().update_round(&pool, &ledger);
        // c[1] scored 0 on both: rep 0.5, unclamped weight would be below base
        assert_eq!(c[1].weight(), 1000.0);
        assert!(c[0].weight() > 1000.0);
    }

    #[test]
    fn test_invalid_rep_base_rejected() {
        let config = ReputationConfig {
            rep_base: -1.0,
            ..Default::default()
        };
        assert!(ReputationUpdater::new(config).is_err());
    }
}
