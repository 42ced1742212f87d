//! Integration tests for Tollgate
//!
//! These tests drive the whole pipeline: screener flags, gate audits,
//! committee reviews, status changes, and the statistics ledger.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;
use tollgate_committee::{CommitteeError, JudgmentPolicy};
use tollgate_core::{Actor, ActorId, ActorKind, ActorStatus, ExemplarSet};
use tollgate_gate::{GateConfig, JudgmentGate};
use tollgate_oracle::{
    Judgment, JudgmentOracle, JudgmentRequest, OracleError, RetryPolicy, RuleOracle,
    ScriptedOracle, SuspicionRule,
};
use tollgate_sim::{build_candidates, Agent, Behavior, SimConfig, SimError, Simulator};
use tollgate_stats::{StatsEntry, StatsLedger};

fn rule_oracle() -> Arc<RuleOracle> {
    Arc::new(RuleOracle::new(SuspicionRule::default()))
}

fn no_exemplars() -> Arc<ExemplarSet> {
    Arc::new(ExemplarSet::default())
}

/// Four sparse transfers spread over the day
fn quiet_actor(id: u32) -> Arc<Actor> {
    let actor = Arc::new(Actor::new(ActorId(id), ActorKind::Retail));
    for k in 0..4 {
        let amount = if k % 2 == 0 { 1.0 } else { 0.1 };
        actor.record(amount, k * 300 + id % 7);
    }
    actor
}

/// Bans everything and tracks peak in-flight calls
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
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Judgment::ban("counted"))
    }
}

fn pipeline_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.candidates.honest = 7;
    config.candidates.colluding = 3;
    config.candidates.judgment = JudgmentPolicy::Rule;
    config.committee.size = 10;
    config.committee.retry = RetryPolicy::immediate(1);
    config.gate.retry = RetryPolicy::immediate(1);
    config
}

fn small_run_config(seed: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.seed = seed;
    config.schedule.max_minutes = 120;
    config.schedule.tick_concurrency = 4;
    config.population.retail = 200;
    config.population.exchanges = 5;
    config.population.exempt_exchanges = 2;
    config.population.small_launderers = 2;
    config.population.large_launderers = 1;
    config.gate.retry = RetryPolicy::immediate(1);
    config.committee.retry = RetryPolicy::immediate(1);
    config
}

/// Test: burst launderer among quiet actors → flagged → escalated → banned
#[tokio::test]
async fn test_burst_launderer_is_intercepted() {
    let mut agents: Vec<Agent> = (0..49)
        .map(|i| Agent::new(quiet_actor(i), Behavior::Retail { rate: 0.0 }, u64::from(i)))
        .collect();

    let launderer = Arc::new(Actor::with_mandate(ActorId(49), ActorKind::Launderer, 3000.0));
    for t in 0..30 {
        assert!(launderer.record(100.0, t));
    }
    agents.push(Agent::new(
        Arc::clone(&launderer),
        Behavior::RuleLaunderer { deadline: 0 },
        49,
    ));

    let mut sim = Simulator::with_agents(
        pipeline_config(),
        agents,
        rule_oracle(),
        no_exemplars(),
        StatsLedger::in_memory(),
    )
    .unwrap();
    sim.rotate_committee().unwrap();
    assert_eq!(sim.committee().len(), 10);

    let report = sim.audit(30).await.unwrap();

    assert_eq!(report.screened, 50);
    assert!(report.flagged.contains(&ActorId(49)));
    assert!(report.escalated.contains(&ActorId(49)));
    assert!(report.banned.contains(&ActorId(49)));
    assert!(!report.exempted.contains(&ActorId(49)));
    assert_eq!(launderer.status(), ActorStatus::Banned);
    assert_eq!(launderer.banned_at(), Some(30));

    // Quiet actors are never banned
    assert!(sim
        .actors()
        .iter()
        .filter(|a| !a.is_launderer())
        .all(|a| a.status() != ActorStatus::Banned));

    let stats = sim.report();
    assert_eq!(stats.rounds, 1);
    assert_eq!(stats.banned_launderers, 1);
    assert_eq!(stats.legitimate_bans, 0);
    assert_eq!(stats.overall_recall, 1.0);
    assert_eq!(report.record.committee.precision, 1.0);
}

/// Test: many escalations never exceed review × vote oracle concurrency
#[tokio::test]
async fn test_committee_fanout_is_bounded() {
    // Actor i sends i + 1 transfers, one per minute
    let agents: Vec<Agent> = (0..60u32)
        .map(|i| {
            let actor = Arc::new(Actor::new(ActorId(i), ActorKind::Retail));
            for t in 0..=i {
                actor.record(if t % 3 == 0 { 10.0 } else { 1.0 }, t);
            }
            Agent::new(actor, Behavior::Retail { rate: 0.0 }, u64::from(i))
        })
        .collect();

    let mut config = SimConfig::default();
    config.screener.contamination = 0.5;
    config.candidates.honest = 10;
    config.candidates.colluding = 0;
    config.candidates.judgment = JudgmentPolicy::Oracle;
    config.committee.size = 10;
    config.committee.vote_concurrency = 3;
    config.committee.review_concurrency = 2;
    config.committee.retry = RetryPolicy::immediate(1);
    config.gate.retry = RetryPolicy::immediate(1);

    let oracle = Arc::new(CountingOracle::default());
    let mut sim = Simulator::with_agents(
        config,
        agents,
        oracle.clone(),
        no_exemplars(),
        StatsLedger::in_memory(),
    )
    .unwrap();
    sim.rotate_committee().unwrap();

    let report = sim.audit(60).await.unwrap();

    assert!(report.escalated.len() >= 3);
    assert_eq!(report.banned.len(), report.escalated.len());
    let peak = oracle.peak.load(Ordering::SeqCst);
    assert!(peak <= 6, "peak in-flight {} exceeds 2 reviews x 3 votes", peak);
}

/// Test: a verdict that arrives after the actor was exempted is dropped
#[tokio::test]
async fn test_stale_gate_verdict_leaves_exempt_actor_alone() {
    let oracle = Arc::new(ScriptedOracle::new(true).with_delay(Duration::from_millis(50)));
    let gate = JudgmentGate::new(
        oracle.clone(),
        no_exemplars(),
        GateConfig {
            retry: RetryPolicy::immediate(1),
            ..Default::default()
        },
    );
    let actor = Arc::new(Actor::new(ActorId(7), ActorKind::Retail));

    let task = {
        let gate = gate.clone();
        let actor = Arc::clone(&actor);
        tokio::spawn(async move { gate.audit_one(&actor, 10).await })
    };

    oracle.wait_for_call().await;
    assert!(actor.try_exempt());

    assert_eq!(task.await.unwrap(), None);
    assert!(actor.is_alive());
    assert!(actor.is_exempt());
    // Exempt actors cannot be banned afterwards either
    assert!(!actor.try_ban(11));
}

/// Test: a committee larger than the pool is refused up front
#[tokio::test]
async fn test_oversize_committee_is_rejected() {
    let mut config = pipeline_config();
    config.committee.size = 11;

    assert!(matches!(
        config.validate(),
        Err(SimError::CommitteeError(CommitteeError::InsufficientCandidates {
            requested: 11,
            available: 10
        }))
    ));
    assert!(Simulator::new(
        config.clone(),
        rule_oracle(),
        no_exemplars(),
        StatsLedger::in_memory()
    )
    .is_err());

    let pool = build_candidates(&config.candidates);
    let mut rng = StdRng::seed_from_u64(1);
    assert!(matches!(
        pool.draw(11, &mut rng),
        Err(CommitteeError::InsufficientCandidates { .. })
    ));
}

/// Test: short full run writes rounds, volumes, and a summary
#[tokio::test]
async fn test_short_run_writes_statistics() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stats.jsonl");

    let mut sim = Simulator::new(
        small_run_config(11),
        rule_oracle(),
        no_exemplars(),
        StatsLedger::new(&path).unwrap(),
    )
    .unwrap();
    let summary = sim.run().await.unwrap();

    assert!(summary.minutes <= 120);
    assert_eq!(
        summary.banned_launderers + summary.remaining_launderers,
        3
    );
    assert!(summary.launderer_volume > 0.0);
    assert!(summary.legitimate_volume > 0.0);

    let report = sim.report();
    assert!(report
        .transferred
        .windows(2)
        .all(|w| w[0].total <= w[1].total && w[0].minute < w[1].minute));

    let entries = StatsLedger::new(&path).unwrap().read_all().unwrap();
    let rounds = entries
        .iter()
        .filter(|e| matches!(e, StatsEntry::Round(_)))
        .count();
    let volumes = entries
        .iter()
        .filter(|e| matches!(e, StatsEntry::Volume(_)))
        .count();
    assert_eq!(rounds, report.rounds);
    assert_eq!(volumes, report.transferred.len());
    assert!(volumes >= 1);
    match entries.last() {
        Some(StatsEntry::Summary(written)) => assert_eq!(written, &summary),
        other => panic!("expected summary last, got {:?}", other),
    }
}

/// Test: the same seed reproduces the same run
#[tokio::test]
async fn test_same_seed_same_outcome() {
    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let mut sim = Simulator::new(
            small_run_config(5),
            rule_oracle(),
            no_exemplars(),
            StatsLedger::in_memory(),
        )
        .unwrap();
        outcomes.push(sim.run().await.unwrap());
    }

    let (a, b) = (&outcomes[0], &outcomes[1]);
    assert_eq!(a.minutes, b.minutes);
    assert_eq!(a.banned_launderers, b.banned_launderers);
    assert_eq!(a.legitimate_bans, b.legitimate_bans);
    assert_eq!(a.legitimate_volume, b.legitimate_volume);
    assert_eq!(a.launderer_volume, b.launderer_volume);
}
