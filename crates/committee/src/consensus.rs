//! Committee Consensus - one concurrent vote per member, quorum verdict
//!
//! Honest members only look at the subject's own history (rule) or ask the
//! oracle with the reference exemplars. Colluding members shield affiliates
//! unless the affiliate's outstanding mandate exceeds the collusion threshold.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use tollgate_core::{Actor, ActorId, ExemplarSet};
use tollgate_oracle::{FailPolicy, JudgmentOracle, JudgmentRequest, TeammateContext};

use crate::candidate::{Candidate, CandidateId, Honesty, VotePolicy};
use crate::config::CommitteeConfig;
use crate::error::CommitteeResult;
use crate::pool::{CandidatePool, Committee};
use crate::review::{ReviewLedger, ReviewTicket};

/// One member's vote on one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberVote {
    pub candidate: CandidateId,
    pub honesty: Honesty,
    pub ban: bool,
}

/// Ban counts split by member honesty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteBreakdown {
    pub honest_ban: usize,
    pub honest_total: usize,
    pub colluding_ban: usize,
    pub colluding_total: usize,
}

/// Result of one committee review
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub subject: ActorId,
    pub ticket: ReviewTicket,
    /// `true` = ban
    pub verdict: bool,
    pub votes: Vec<MemberVote>,
}

impl ConsensusOutcome {
    pub fn ban_votes(&self) -> usize {
        self.votes.iter().filter(|v| v.ban).count()
    }

    pub fn breakdown(&self) -> VoteBreakdown {
        let mut b = VoteBreakdown::default();
        for vote in &self.votes {
            match vote.honesty {
                Honesty::Honest => {
                    b.honest_total += 1;
                    b.honest_ban += usize::from(vote.ban);
                }
                Honesty::Colluding => {
                    b.colluding_total += 1;
                    b.colluding_ban += usize::from(vote.ban);
                }
            }
        }
        b
    }
}

/// Voting engine shared by every review
///
/// Clones share one review semaphore, so at most `review_concurrency` reviews
/// vote at once and at most `review_concurrency * vote_concurrency` oracle
/// calls are in flight.
#[derive(Clone)]
pub struct CommitteeConsensus {
    oracle: Arc<dyn JudgmentOracle>,
    exemplars: Arc<ExemplarSet>,
    review_permits: Arc<Semaphore>,
    config: Arc<CommitteeConfig>,
}

impl CommitteeConsensus {
    pub fn new(
        oracle: Arc<dyn JudgmentOracle>,
        exemplars: Arc<ExemplarSet>,
        config: CommitteeConfig,
    ) -> CommitteeResult<Self> {
        config.validate()?;
        Ok(Self {
            oracle,
            exemplars,
            review_permits: Arc::new(Semaphore::new(config.review_concurrency)),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &CommitteeConfig {
        &self.config
    }

    /// Draw a fresh committee of `k` from `pool` and review `subject`
    ///
    /// `Ok(None)` when the review was skipped or its verdict went stale.
    pub async fn convene<R: Rng>(
        &self,
        subject: &Arc<Actor>,
        pool: &CandidatePool,
        k: usize,
        rng: &mut R,
        ledger: &ReviewLedger,
        now: u32,
    ) -> CommitteeResult<Option<ConsensusOutcome>> {
        let committee = pool.draw(k, rng)?;
        Ok(self.review(&committee, subject, ledger, now).await)
    }

    /// Collect one vote from every member and apply the quorum
    ///
    /// Every vote lands in its member's history under this review's ticket,
    /// whatever the verdict. Returns `None` without voting when the subject is
    /// already banned or exempt, and `None` with the ticket left open when
    /// the subject changed status while the votes were out.
    pub async fn review(
        &self,
        committee: &Committee,
        subject: &Arc<Actor>,
        ledger: &ReviewLedger,
        now: u32,
    ) -> Option<ConsensusOutcome> {
        if !subject.is_alive() || subject.is_exempt() {
            debug!(subject = %subject.id(), status = %subject.status(), "Review skipped");
            return None;
        }

        let Ok(_review_permit) = self.review_permits.acquire().await else {
            return None;
        };

        // Status may have changed while queued for a permit
        if !subject.is_alive() || subject.is_exempt() {
            debug!(subject = %subject.id(), status = %subject.status(), "Review skipped");
            return None;
        }

        let ticket = ledger.open();
        let permits = self.config.vote_concurrency.min(committee.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut handles = Vec::with_capacity(committee.len());
        for member in committee.members() {
            let engine = self.clone();
            let member = Arc::clone(member);
            let subject = Arc::clone(subject);
            let semaphore = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok()?;
                let ban = engine.vote(&member, &subject, now).await;
                member.record_vote(ticket, ban);
                Some(MemberVote {
                    candidate: member.id(),
                    honesty: member.honesty(),
                    ban,
                })
            }));
        }

        let mut votes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(vote)) => votes.push(vote),
                Ok(None) => warn!(subject = %subject.id(), "Vote dropped, semaphore closed"),
                Err(e) => error!(subject = %subject.id(), error = %e, "Vote task failed"),
            }
        }

        let ban_votes = votes.iter().filter(|v| v.ban).count();
        let verdict = !committee.is_empty() && ban_votes >= self.config.quorum(committee.len());

        // An open ticket never reaches the reputation update
        if !subject.is_alive() || subject.is_exempt() {
            warn!(
                subject = %subject.id(),
                verdict,
                status = %subject.status(),
                "Discarding stale committee verdict"
            );
            return None;
        }
        ledger.close(ticket, verdict, subject.is_launderer());

        let outcome = ConsensusOutcome {
            subject: subject.id(),
            ticket,
            verdict,
            votes,
        };
        let breakdown = outcome.breakdown();
        info!(
            subject = %subject.id(),
            verdict,
            ban_votes,
            k = committee.len(),
            honest_ban = breakdown.honest_ban,
            colluding_ban = breakdown.colluding_ban,
            "Committee verdict"
        );
        Some(outcome)
    }

    async fn vote(&self, member: &Candidate, subject: &Actor, now: u32) -> bool {
        let policy = member.vote_policy();
        let ban = match policy {
            VotePolicy::HonestRule => self.config.rule.verdict(&subject.history(), now),
            VotePolicy::HonestOracle => {
                let request = JudgmentRequest::new(subject.history(), Arc::clone(&self.exemplars), now);
                self.ask_oracle(member, &request, self.config.honest_fallback)
                    .await
            }
            VotePolicy::ColludingRule | VotePolicy::ColludingOracle => {
                self.colluding_vote(member, policy, subject, now).await
            }
        };

        debug!(
            candidate = %member.id(),
            policy = %policy,
            subject = %subject.id(),
            ban,
            "Vote cast"
        );
        ban
    }

    async fn colluding_vote(
        &self,
        member: &Candidate,
        policy: VotePolicy,
        subject: &Actor,
        now: u32,
    ) -> bool {
        if !subject.is_launderer() {
            return true;
        }

        let mandate = subject.mandate();
        let remaining = mandate.map_or(0.0, |m| m.remaining);
        // Self-preservation override
        if remaining > self.config.collusion_task_threshold {
            return true;
        }

        match policy {
            VotePolicy::ColludingOracle => {
                let teammate = TeammateContext {
                    progress_ratio: mandate.map_or(1.0, |m| m.progress_ratio()),
                    remaining,
                };
                let request =
                    JudgmentRequest::new(subject.history(), Arc::clone(&self.exemplars), now)
                        .with_teammate(teammate);
                self.ask_oracle(member, &request, self.config.colluding_fallback)
                    .await
            }
            _ => false,
        }
    }

    async fn ask_oracle(
        &self,
        member: &Candidate,
        request: &JudgmentRequest,
        fallback: FailPolicy,
    ) -> bool {
        match self.config.retry.judge(self.oracle.as_ref(), request).await {
            Ok(judgment) => judgment.verdict,
            Err(e) => {
                warn!(
                    candidate = %member.id(),
                    error = %e,
                    policy = %fallback,
                    "Vote oracle exhausted, using fallback"
                );
                fallback.verdict()
            }
        }
    }
}
