//! Judgment Gate - audits flagged actors under bounded concurrency

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use tollgate_core::{Actor, ActorId, ExemplarSet};
use tollgate_oracle::{JudgmentOracle, JudgmentRequest};

use crate::config::GateConfig;

/// Result of auditing one actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditResult {
    /// Dead or exempt before dispatch; the oracle was not called
    Skipped,
    /// The actor was exempted or banned while the call was in flight
    Stale { verdict: bool },
    /// Fresh verdict (`true` = ban)
    Verdict { ban: bool, fell_back: bool },
}

impl AuditResult {
    /// Actionable verdict, `None` if skipped or stale
    pub fn verdict(self) -> Option<bool> {
        match self {
            AuditResult::Verdict { ban, .. } => Some(ban),
            _ => None,
        }
    }
}

/// Aggregate of one audit pass
#[derive(Debug, Default)]
pub struct GateOutcome {
    /// Actors with a fresh ban verdict, for the committee
    pub escalated: Vec<Arc<Actor>>,
    /// Every fresh verdict
    pub verdicts: Vec<(ActorId, bool)>,
    /// Verdicts dropped because the actor changed status mid-call
    pub stale_discarded: usize,
    /// Verdicts that came from the fail policy
    pub fallbacks: usize,
    /// Actors not dispatched (dead or exempt)
    pub skipped: usize,
}

impl GateOutcome {
    /// Number of oracle verdicts acted upon
    pub fn audited(&self) -> usize {
        self.verdicts.len()
    }
}

/// Bounded-concurrency oracle front for screener flags
#[derive(Clone)]
pub struct JudgmentGate {
    oracle: Arc<dyn JudgmentOracle>,
    exemplars: Arc<ExemplarSet>,
    semaphore: Arc<Semaphore>,
    config: GateConfig,
}

impl JudgmentGate {
    pub fn new(
        oracle: Arc<dyn JudgmentOracle>,
        exemplars: Arc<ExemplarSet>,
        config: GateConfig,
    ) -> Self {
        let permits = config.concurrency.max(1);
        Self {
            oracle,
            exemplars,
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    /// Single-actor contract: `Some(ban)` or `None` when skipped/stale
    pub async fn audit_one(&self, actor: &Arc<Actor>, now: u32) -> Option<bool> {
        self.audit_actor(actor, now).await.verdict()
    }

    /// Audit every live, non-exempt actor in `flagged`
    ///
    /// All spawned audits are joined before returning.
    pub async fn audit(&self, flagged: &[Arc<Actor>], now: u32) -> GateOutcome {
        let mut outcome = GateOutcome::default();
        let mut handles = Vec::new();

        for actor in flagged {
            if !actor.is_alive() || actor.is_exempt() {
                outcome.skipped += 1;
                continue;
            }
            let gate = self.clone();
            let actor = Arc::clone(actor);
            handles.push(tokio::spawn(async move {
                let result = gate.audit_actor(&actor, now).await;
                (actor, result)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((actor, result)) => match result {
                    AuditResult::Skipped => outcome.skipped += 1,
                    AuditResult::Stale { .. } => outcome.stale_discarded += 1,
                    AuditResult::Verdict { ban, fell_back } => {
                        if fell_back {
                            outcome.fallbacks += 1;
                        }
                        outcome.verdicts.push((actor.id(), ban));
                        if ban {
                            outcome.escalated.push(actor);
                        }
                    }
                },
                Err(e) => error!(error = %e, "Audit task failed"),
            }
        }

        info!(
            now,
            flagged = flagged.len(),
            audited = outcome.audited(),
            escalated = outcome.escalated.len(),
            stale = outcome.stale_discarded,
            fallbacks = outcome.fallbacks,
            "Gate audit complete"
        );
        outcome
    }

    async fn audit_actor(&self, actor: &Arc<Actor>, now: u32) -> AuditResult {
        if !actor.is_alive() || actor.is_exempt() {
            return AuditResult::Skipped;
        }

        let Ok(_permit) = self.semaphore.acquire().await else {
            return AuditResult::Skipped;
        };

        // Another path may have cleared the actor while we queued
        if !actor.is_alive() || actor.is_exempt() {
            return AuditResult::Skipped;
        }

        let request = JudgmentRequest::new(actor.history(), Arc::clone(&self.exemplars), now);
        let (ban, fell_back) = match self.config.retry.judge(self.oracle.as_ref(), &request).await {
            Ok(judgment) => {
                debug!(
                    actor = %actor.id(),
                    oracle = self.oracle.name(),
                    verdict = judgment.verdict,
                    rationale = %judgment.rationale,
                    "Oracle judgment"
                );
                (judgment.verdict, false)
            }
            Err(e) => {
                let fallback = self.config.fail_policy.fallback(&e);
                warn!(
                    actor = %actor.id(),
                    error = %e,
                    policy = %self.config.fail_policy,
                    "Oracle exhausted, using fail policy"
                );
                (fallback.verdict, true)
            }
        };

        if !actor.is_alive() || actor.is_exempt() {
            warn!(
                actor = %actor.id(),
                verdict = ban,
                status = %actor.status(),
                "Discarding stale verdict"
            );
            return AuditResult::Stale { verdict: ban };
        }

        AuditResult::Verdict { ban, fell_back }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tollgate_core::ActorKind;
    use tollgate_oracle::{
        FailPolicy, Judgment, OracleError, RetryPolicy, ScriptedOracle,
    };

    fn config() -> GateConfig {
        GateConfig {
            retry: RetryPolicy::immediate(3),
            ..Default::default()
        }
    }

    fn actors(n: u32) -> Vec<Arc<Actor>> {
        (0..n)
            .map(|i| Arc::new(Actor::new(ActorId(i), ActorKind::Retail)))
            .collect()
    }

    fn gate(oracle: Arc<dyn JudgmentOracle>, config: GateConfig) -> JudgmentGate {
        JudgmentGate::new(oracle, Arc::new(ExemplarSet::default()), config)
    }

    /// Tracks peak in-flight calls
    #[derive(Default)]
    struct CountingOracle {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl JudgmentOracle for CountingOracle {
        async fn judge(&self, _request: &JudgmentRequest) -> Result<Judgment, OracleError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Judgment::ban("counted"))
        }
    }

    #[tokio::test]
    async fn test_ban_verdicts_escalate() {
        let oracle = Arc::new(ScriptedOracle::new(true));
        let gate = gate(oracle.clone(), config());
        let flagged = actors(2);

        let outcome = gate.audit(&flagged, 10).await;

        assert_eq!(outcome.escalated.len(), 2);
        assert_eq!(outcome.audited(), 2);
        assert_eq!(oracle.calls(), 2);
        // The gate never bans on its own
        assert!(flagged.iter().all(|a| a.is_alive()));
    }

    #[tokio::test]
    async fn test_pass_verdicts_not_escalated() {
        let gate = gate(Arc::new(ScriptedOracle::new(false)), config());
        let outcome = gate.audit(&actors(3), 10).await;

        assert!(outcome.escalated.is_empty());
        assert_eq!(outcome.verdicts.len(), 3);
    }

    #[tokio::test]
    async fn test_exempt_and_banned_never_dispatched() {
        let oracle = Arc::new(ScriptedOracle::new(true));
        let gate = gate(oracle.clone(), config());
        let flagged = actors(2);
        flagged[0].try_exempt();
        flagged[1].try_ban(1);

        let outcome = gate.audit(&flagged, 10).await;

        assert_eq!(outcome.skipped, 2);
        assert_eq!(oracle.calls(), 0);
        assert_eq!(gate.audit_one(&flagged[0], 10).await, None);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let oracle = Arc::new(CountingOracle::default());
        let gate = gate(oracle.clone(), config());

        let outcome = gate.audit(&actors(12), 10).await;

        assert_eq!(outcome.escalated.len(), 12);
        let peak = oracle.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight {} exceeds limit", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_stale_verdict_discarded() {
        let oracle = Arc::new(ScriptedOracle::new(true).with_delay(Duration::from_millis(50)));
        let gate = gate(oracle.clone(), config());
        let actor = actors(1).remove(0);

        let task = {
            let gate = gate.clone();
            let actor = Arc::clone(&actor);
            tokio::spawn(async move { gate.audit(&[actor], 10).await })
        };

        // Exempt the actor while its audit call is in flight
        oracle.wait_for_call().await;
        assert!(actor.try_exempt());

        let outcome = task.await.unwrap();
        assert_eq!(outcome.stale_discarded, 1);
        assert!(outcome.escalated.is_empty());
        assert!(actor.is_alive());
        assert!(actor.is_exempt());
    }

    #[tokio::test]
    async fn test_exhaustion_uses_fail_policy() {
        let oracle = Arc::new(ScriptedOracle::new(true).failing_first(10));
        let open = gate(oracle.clone(), config());
        let outcome = open.audit(&actors(1), 10).await;

        assert_eq!(outcome.fallbacks, 1);
        assert!(outcome.escalated.is_empty());
        assert_eq!(oracle.calls(), 3);

        let closed = gate(
            Arc::new(ScriptedOracle::new(false).failing_first(10)),
            GateConfig {
                fail_policy: FailPolicy::FailClosed,
                ..config()
            },
        );
        assert_eq!(closed.audit_one(&actors(1)[0], 10).await, Some(true));
    }
}
