//! Candidate - a committee voter
//!
//! Standing (weight, reputation) is written only by the reputation updater;
//! votes are appended concurrently by reviews, each under its own lock.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::review::ReviewTicket;

/// Unique candidate identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub u32);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate-{}", self.0)
    }
}

/// Whether the candidate votes in good faith
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Honesty {
    Honest,
    Colluding,
}

/// How the candidate reaches a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JudgmentPolicy {
    /// Deterministic suspicion rule
    Rule,
    /// Judgment Oracle call
    Oracle,
}

/// Voting behavior, one variant per honesty/judgment combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum VotePolicy {
    HonestRule,
    HonestOracle,
    ColludingRule,
    ColludingOracle,
}

impl VotePolicy {
    pub fn new(honesty: Honesty, policy: JudgmentPolicy) -> Self {
        match (honesty, policy) {
            (Honesty::Honest, JudgmentPolicy::Rule) => VotePolicy::HonestRule,
            (Honesty::Honest, JudgmentPolicy::Oracle) => VotePolicy::HonestOracle,
            (Honesty::Colluding, JudgmentPolicy::Rule) => VotePolicy::ColludingRule,
            (Honesty::Colluding, JudgmentPolicy::Oracle) => VotePolicy::ColludingOracle,
        }
    }

    pub fn honesty(self) -> Honesty {
        match self {
            VotePolicy::HonestRule | VotePolicy::HonestOracle => Honesty::Honest,
            VotePolicy::ColludingRule | VotePolicy::ColludingOracle => Honesty::Colluding,
        }
    }
}

/// Sampling weight and accumulated reputation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub weight: f64,
    pub reputation: f64,
}

/// One vote, tagged with the review it was cast for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    pub review: ReviewTicket,
    pub ban: bool,
}

/// A committee voter
#[derive(Debug)]
pub struct Candidate {
    id: CandidateId,
    policy: VotePolicy,
    standing: RwLock<Standing>,
    votes: Mutex<Vec<CastVote>>,
}

impl Candidate {
    pub fn new(
        id: CandidateId,
        honesty: Honesty,
        policy: JudgmentPolicy,
        weight: f64,
        reputation: f64,
    ) -> Self {
        Self {
            id,
            policy: VotePolicy::new(honesty, policy),
            standing: RwLock::new(Standing { weight, reputation }),
            votes: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn honesty(&self) -> Honesty {
        self.policy.honesty()
    }

    pub fn vote_policy(&self) -> VotePolicy {
        self.policy
    }

    pub fn standing(&self) -> Standing {
        *self.standing.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn weight(&self) -> f64 {
        self.standing().weight
    }

    pub fn reputation(&self) -> f64 {
        self.standing().reputation
    }

    pub(crate) fn set_standing(&self, standing: Standing) {
        *self.standing.write().unwrap_or_else(PoisonError::into_inner) = standing;
    }

    /// Append a vote to this period's history
    pub fn record_vote(&self, review: ReviewTicket, ban: bool) {
        self.votes().push(CastVote { review, ban });
    }

    /// This period's votes
    pub fn cast_votes(&self) -> Vec<CastVote> {
        self.votes().clone()
    }

    pub(crate) fn clear_votes(&self) {
        self.votes().clear();
    }

    fn votes(&self) -> MutexGuard<'_, Vec<CastVote>> {
        self.votes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
