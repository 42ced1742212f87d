//! Simulator - drives the pipeline one minute at a time
//!
//! ```text
//! every minute        behavior tick (chunked workers)
//! every audit period  screener → gate → committee → ban / exempt → stats
//!                     (never at minute 0)
//! every audit period  launderer volume recorded (minute 0 included)
//! every rep. period   reputation update, next committee drawn
//! ```
//!
//! Rounds never overlap; every task spawned inside a round is joined before
//! statistics or reputations are touched.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info};

use tollgate_committee::{
    CandidatePool, Committee, CommitteeConsensus, ConsensusOutcome, ReputationUpdater,
    ReviewLedger, RoundUpdate,
};
use tollgate_core::{Actor, ActorId, ExemplarSet, FeatureVector};
use tollgate_gate::JudgmentGate;
use tollgate_oracle::JudgmentOracle;
use tollgate_screener::Screener;
use tollgate_stats::{
    Report, RoundOutcome, RoundRecord, RunSummary, StatsCollector, StatsLedger, Subject, Verdict,
};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::population::{build_candidates, build_population, Agent};

/// What one audit round did
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub minute: u32,
    /// Live actors the screener was trained on
    pub screened: usize,
    pub flagged: Vec<ActorId>,
    pub escalated: Vec<ActorId>,
    pub banned: Vec<ActorId>,
    pub exempted: Vec<ActorId>,
    pub stale_discarded: usize,
    pub record: RoundRecord,
}

pub struct Simulator {
    config: SimConfig,
    agents: Vec<Agent>,
    actors: Vec<Arc<Actor>>,
    pool: CandidatePool,
    committee: Arc<Committee>,
    reviews: Arc<ReviewLedger>,
    gate: JudgmentGate,
    consensus: CommitteeConsensus,
    updater: ReputationUpdater,
    stats: StatsCollector,
    sink: StatsLedger,
    rng: StdRng,
    now: u32,
}

impl Simulator {
    /// Build the configured population and candidate pool
    pub fn new(
        config: SimConfig,
        oracle: Arc<dyn JudgmentOracle>,
        exemplars: Arc<ExemplarSet>,
        sink: StatsLedger,
    ) -> SimResult<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let agents = build_population(&config.population, config.schedule.max_minutes, &mut rng);
        Self::assemble(config, agents, rng, oracle, exemplars, sink)
    }

    /// Run a hand-built population instead of the configured one
    pub fn with_agents(
        config: SimConfig,
        agents: Vec<Agent>,
        oracle: Arc<dyn JudgmentOracle>,
        exemplars: Arc<ExemplarSet>,
        sink: StatsLedger,
    ) -> SimResult<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Self::assemble(config, agents, rng, oracle, exemplars, sink)
    }

    fn assemble(
        config: SimConfig,
        agents: Vec<Agent>,
        rng: StdRng,
        oracle: Arc<dyn JudgmentOracle>,
        exemplars: Arc<ExemplarSet>,
        sink: StatsLedger,
    ) -> SimResult<Self> {
        let actors: Vec<Arc<Actor>> = agents.iter().map(|a| Arc::clone(a.actor())).collect();
        let launderers = actors.iter().filter(|a| a.is_launderer()).count();

        let gate = JudgmentGate::new(
            Arc::clone(&oracle),
            Arc::clone(&exemplars),
            config.gate.clone(),
        );
        let consensus = CommitteeConsensus::new(oracle, exemplars, config.committee.clone())?;
        let updater = ReputationUpdater::new(config.reputation.clone())?;
        let stats = StatsCollector::new(launderers);

        info!(
            run_id = %stats.run_id(),
            actors = actors.len(),
            launderers,
            candidates = config.candidates.total(),
            seed = config.seed,
            "Simulator ready"
        );

        Ok(Self {
            pool: build_candidates(&config.candidates),
            committee: Arc::new(Committee::default()),
            reviews: Arc::new(ReviewLedger::new()),
            config,
            agents,
            actors,
            gate,
            consensus,
            updater,
            stats,
            sink,
            rng,
            now: 0,
        })
    }

    pub fn now(&self) -> u32 {
        self.now
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn actors(&self) -> &[Arc<Actor>] {
        &self.actors
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub fn committee(&self) -> &Committee {
        &self.committee
    }

    pub fn report(&self) -> Report {
        self.stats.report()
    }

    pub fn launderers_alive(&self) -> usize {
        self.actors
            .iter()
            .filter(|a| a.is_launderer() && a.is_alive())
            .count()
    }

    /// Run until `max_minutes` or until no launderer is left
    pub async fn run(&mut self) -> SimResult<RunSummary> {
        let max_minutes = self.config.schedule.max_minutes;
        while self.now < max_minutes && self.launderers_alive() > 0 {
            self.step().await?;
        }

        let summary = self.summarize();
        self.sink.append(summary.clone())?;
        info!(
            minutes = summary.minutes,
            banned_launderers = summary.banned_launderers,
            legitimate_bans = summary.legitimate_bans,
            remaining_launderers = summary.remaining_launderers,
            volume_ratio = summary.volume_ratio,
            "Simulation finished"
        );
        Ok(summary)
    }

    /// Advance the clock by one minute
    pub async fn step(&mut self) -> SimResult<Option<AuditReport>> {
        let now = self.now;
        let audit_period = self.config.schedule.audit_period;
        let reputation_period = self.config.schedule.reputation_period;

        self.tick(now).await?;

        let report = if now % audit_period == 0 && now != 0 {
            Some(self.audit(now).await?)
        } else {
            None
        };
        if now % audit_period == 0 {
            self.record_volume(now)?;
        }
        if now % reputation_period == 0 {
            self.rotate_committee()?;
        }

        self.now += 1;
        Ok(report)
    }

    async fn tick(&mut self, now: u32) -> SimResult<()> {
        let agents = std::mem::take(&mut self.agents);
        let workers = self.config.schedule.tick_concurrency.max(1);
        let chunk_size = agents.len().div_ceil(workers).max(1);

        let mut handles = Vec::with_capacity(workers);
        let mut remaining = agents.into_iter();
        loop {
            let mut chunk: Vec<Agent> = remaining.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            handles.push(tokio::spawn(async move {
                let sent: usize = chunk.iter_mut().map(|agent| agent.tick(now)).sum();
                (chunk, sent)
            }));
        }

        let mut sent = 0;
        for handle in handles {
            let (chunk, n) = handle
                .await
                .map_err(|e| SimError::TaskError(e.to_string()))?;
            self.agents.extend(chunk);
            sent += n;
        }
        debug!(now, sent, "Tick complete");
        Ok(())
    }

    /// Screen every live actor, audit the flags, review the escalations and
    /// apply the verdicts
    pub async fn audit(&mut self, now: u32) -> SimResult<AuditReport> {
        if self.committee.is_empty() {
            self.draw_committee()?;
        }

        // 1. Retrain the screener on everyone still alive
        let live: Vec<Arc<Actor>> = self.actors.iter().filter(|a| a.is_alive()).cloned().collect();
        let live_launderers = live.iter().filter(|a| a.is_launderer()).count();
        let features: Vec<FeatureVector> = live.iter().map(|a| a.features()).collect();

        let screener = Screener::train(&features, &self.config.screener);
        let flagged: Vec<Arc<Actor>> = screener
            .flag(&features)
            .into_iter()
            .map(|i| Arc::clone(&live[i]))
            .collect();
        let truth: HashMap<ActorId, bool> =
            flagged.iter().map(|a| (a.id(), a.is_launderer())).collect();

        // 2. Gate, then committee on the escalations
        let gate_outcome = self.gate.audit(&flagged, now).await;
        let reviews = self.review(&gate_outcome.escalated, now).await;

        // 3. Apply verdicts once every review has joined
        let mut banned = Vec::new();
        let mut exempted = Vec::new();
        for (actor, outcome) in &reviews {
            if outcome.verdict {
                if actor.try_ban(now) {
                    banned.push(actor.id());
                }
            } else if actor.try_exempt() {
                exempted.push(actor.id());
            }
        }

        // 4. Record the round
        let round = RoundOutcome {
            minute: now,
            live_launderers,
            flagged: flagged
                .iter()
                .map(|a| Subject::new(a.id(), a.is_launderer()))
                .collect(),
            audited: gate_outcome
                .verdicts
                .iter()
                .map(|(id, ban)| Verdict::new(*id, truth.get(id).copied().unwrap_or(false), *ban))
                .collect(),
            reviewed: reviews
                .iter()
                .map(|(actor, outcome)| Verdict::new(actor.id(), actor.is_launderer(), outcome.verdict))
                .collect(),
        };
        let record = self.stats.record(&round);
        self.sink.append(record.clone())?;

        info!(
            minute = now,
            screened = live.len(),
            flagged = flagged.len(),
            escalated = gate_outcome.escalated.len(),
            banned = banned.len(),
            exempted = exempted.len(),
            stale = gate_outcome.stale_discarded,
            "Audit round complete"
        );

        Ok(AuditReport {
            minute: now,
            screened: live.len(),
            flagged: flagged.iter().map(|a| a.id()).collect(),
            escalated: gate_outcome.escalated.iter().map(|a| a.id()).collect(),
            banned,
            exempted,
            stale_discarded: gate_outcome.stale_discarded,
            record,
        })
    }

    /// One committee review per escalated actor
    ///
    /// Tasks are spawned together; the engine's review permits decide how
    /// many vote at once.
    async fn review(
        &self,
        escalated: &[Arc<Actor>],
        now: u32,
    ) -> Vec<(Arc<Actor>, ConsensusOutcome)> {
        let mut handles = Vec::with_capacity(escalated.len());
        for actor in escalated {
            let consensus = self.consensus.clone();
            let committee = Arc::clone(&self.committee);
            let reviews = Arc::clone(&self.reviews);
            let actor = Arc::clone(actor);
            handles.push(tokio::spawn(async move {
                let outcome = consensus.review(&committee, &actor, &reviews, now).await;
                (actor, outcome)
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((actor, Some(outcome))) => outcomes.push((actor, outcome)),
                Ok((actor, None)) => debug!(actor = %actor.id(), "Review produced no verdict"),
                Err(e) => error!(error = %e, "Review task failed"),
            }
        }
        outcomes
    }

    /// Update reputations from the period's reviews and draw the next committee
    pub fn rotate_committee(&mut self) -> SimResult<RoundUpdate> {
        let update = self.updater.update_round(&self.pool, &self.reviews);
        self.draw_committee()?;
        Ok(update)
    }

    fn draw_committee(&mut self) -> SimResult<()> {
        let committee = self.pool.draw(self.config.committee.size, &mut self.rng)?;
        info!(
            minute = self.now,
            members = committee.len(),
            colluding = committee.colluding(),
            "Committee drawn"
        );
        self.committee = Arc::new(committee);
        Ok(())
    }

    fn record_volume(&mut self, now: u32) -> SimResult<()> {
        let total = self.volume(true);
        let point = self.stats.record_volume(now, total);
        self.sink.append(point)?;
        Ok(())
    }

    fn volume(&self, launderers: bool) -> f64 {
        self.actors
            .iter()
            .filter(|a| a.is_launderer() == launderers)
            .map(|a| a.volume())
            .sum()
    }

    pub fn summarize(&self) -> RunSummary {
        self.stats.summarize(
            self.now,
            self.volume(false),
            self.volume(true),
            self.launderers_alive(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use tollgate_core::ActorKind;
    use tollgate_oracle::{RetryPolicy, ScriptedOracle};
    use tollgate_stats::StatsEntry;

    fn config() -> SimConfig {
        let mut config = SimConfig::default();
        config.population.retail = 20;
        config.population.exchanges = 2;
        config.population.exempt_exchanges = 0;
        config.population.small_launderers = 1;
        config.population.large_launderers = 0;
        config.schedule.max_minutes = 61;
        config.schedule.tick_concurrency = 3;
        config.gate.retry = RetryPolicy::immediate(1);
        config.committee.retry = RetryPolicy::immediate(1);
        config
    }

    fn simulator(config: SimConfig, verdict: bool) -> Simulator {
        Simulator::new(
            config,
            Arc::new(ScriptedOracle::new(verdict)),
            Arc::new(ExemplarSet::default()),
            StatsLedger::in_memory(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_schedule() {
        let mut sim = simulator(config(), false);

        // Minute 0: no audit, committee drawn
        assert!(sim.step().await.unwrap().is_none());
        assert_eq!(sim.committee().len(), 10);
        assert_eq!(sim.report().transferred.len(), 1);

        for _ in 1..10 {
            assert!(sim.step().await.unwrap().is_none());
        }
        let report = sim.step().await.unwrap();
        assert_eq!(report.map(|r| r.minute), Some(10));
        assert_eq!(sim.now(), 11);
        assert_eq!(sim.report().rounds, 1);
        assert_eq!(sim.report().transferred.len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_at_max_minutes() {
        let mut sim = simulator(config(), false);
        let summary = sim.run().await.unwrap();

        assert_eq!(summary.minutes, 61);
        assert_eq!(sim.report().rounds, 6);
        // Minutes 0, 10, ..., 60
        assert_eq!(sim.report().transferred.len(), 7);
    }

    #[tokio::test]
    async fn test_run_stops_when_no_launderer_left() {
        let mut config = config();
        config.population.small_launderers = 0;
        let mut sim = simulator(config, true);

        let summary = sim.run().await.unwrap();
        assert_eq!(summary.minutes, 0);
        assert_eq!(sim.report().rounds, 0);
    }

    #[tokio::test]
    async fn test_ticks_are_reproducible() {
        let mut a = simulator(config(), false);
        let mut b = simulator(config(), false);
        for _ in 0..9 {
            a.step().await.unwrap();
            b.step().await.unwrap();
        }

        for (x, y) in a.actors().iter().zip(b.actors()) {
            assert_eq!(x.history(), y.history());
        }
    }

    #[tokio::test]
    async fn test_records_reach_the_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.jsonl");
        let burst = Arc::new(Actor::with_mandate(ActorId(0), ActorKind::Launderer, 10_000.0));
        let agents = vec![Agent::new(burst, Behavior::RuleLaunderer { deadline: 100 }, 1)];

        let mut config = config();
        config.schedule.max_minutes = 21;
        let mut sim = Simulator::with_agents(
            config,
            agents,
            Arc::new(ScriptedOracle::new(false)),
            Arc::new(ExemplarSet::default()),
            StatsLedger::new(&path).unwrap(),
        )
        .unwrap();
        sim.run().await.unwrap();

        let entries = StatsLedger::new(&path).unwrap().read_all().unwrap();
        let rounds = entries.iter().filter(|e| matches!(e, StatsEntry::Round(_))).count();
        let volumes = entries.iter().filter(|e| matches!(e, StatsEntry::Volume(_))).count();
        assert_eq!(rounds, 2);
        assert_eq!(volumes, 3);
        assert!(matches!(entries.last(), Some(StatsEntry::Summary(_))));
    }
}
