//! Population and candidate pool construction

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tollgate_committee::{Candidate, CandidateId, CandidatePool, Honesty};
use tollgate_core::{Actor, ActorId, ActorKind};

use crate::behavior::Behavior;
use crate::config::{CandidateConfig, PopulationConfig};

/// An actor plus the behavior and private random stream that drive it
pub struct Agent {
    actor: Arc<Actor>,
    behavior: Behavior,
    rng: StdRng,
}

impl Agent {
    pub fn new(actor: Arc<Actor>, behavior: Behavior, seed: u64) -> Self {
        Self {
            actor,
            behavior,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn actor(&self) -> &Arc<Actor> {
        &self.actor
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Run one minute; banned actors do nothing
    pub fn tick(&mut self, now: u32) -> usize {
        if !self.actor.is_alive() {
            return 0;
        }
        let remaining = self.actor.mandate().map(|m| m.remaining);
        let mut sent = 0;
        for amount in self.behavior.decide(now, remaining, &mut self.rng) {
            if self.actor.record(amount, now) {
                sent += 1;
            }
        }
        sent
    }
}

/// Build the screened population: retail, then exchanges, then launderers
///
/// Actor ids are positions in the returned list.
pub fn build_population(config: &PopulationConfig, deadline: u32, rng: &mut StdRng) -> Vec<Agent> {
    let mut agents = Vec::with_capacity(config.total());
    let mut next_id = 0u32;

    for _ in 0..config.retail {
        let actor = Actor::new(ActorId(next_id), ActorKind::Retail);
        next_id += 1;
        let behavior = Behavior::Retail { rate: config.retail_rate };
        agents.push(Agent::new(Arc::new(actor), behavior, rng.gen()));
    }

    let first_exempt = config.exchanges.saturating_sub(config.exempt_exchanges);
    for i in 0..config.exchanges {
        let actor = Actor::new(ActorId(next_id), ActorKind::Exchange);
        next_id += 1;
        if i >= first_exempt {
            actor.try_exempt();
        }
        let behavior = Behavior::Exchange { rate: config.exchange_rate };
        agents.push(Agent::new(Arc::new(actor), behavior, rng.gen()));
    }

    let mandates = std::iter::repeat(config.small_mandate)
        .take(config.small_launderers)
        .chain(std::iter::repeat(config.large_mandate).take(config.large_launderers));
    for mandate in mandates {
        let actor = Actor::with_mandate(ActorId(next_id), ActorKind::Launderer, mandate);
        next_id += 1;
        let behavior = Behavior::RuleLaunderer { deadline };
        agents.push(Agent::new(Arc::new(actor), behavior, rng.gen()));
    }

    agents
}

/// Build the candidate pool: honest members first, then colluders
pub fn build_candidates(config: &CandidateConfig) -> CandidatePool {
    let honesty = std::iter::repeat(Honesty::Honest)
        .take(config.honest)
        .chain(std::iter::repeat(Honesty::Colluding).take(config.colluding));

    CandidatePool::new(
        honesty
            .enumerate()
            .map(|(i, honesty)| {
                Candidate::new(
                    CandidateId(i as u32),
                    honesty,
                    config.judgment,
                    config.initial_weight,
                    config.initial_reputation,
                )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::ActorStatus;

    fn small() -> PopulationConfig {
        PopulationConfig {
            retail: 10,
            exchanges: 4,
            exempt_exchanges: 2,
            small_launderers: 2,
            large_launderers: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_population_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        let agents = build_population(&small(), 4320, &mut rng);

        assert_eq!(agents.len(), 17);
        for (i, agent) in agents.iter().enumerate() {
            assert_eq!(agent.actor().id(), ActorId(i as u32));
        }

        let exempt: Vec<u32> = agents
            .iter()
            .filter(|a| a.actor().status() == ActorStatus::Exempt)
            .map(|a| a.actor().id().0)
            .collect();
        assert_eq!(exempt, vec![12, 13]);

        let mandates: Vec<f64> = agents
            .iter()
            .filter_map(|a| a.actor().mandate().map(|m| m.initial))
            .collect();
        assert_eq!(mandates, vec![10_000.0, 10_000.0, 60_000.0]);
        assert!(agents[14..].iter().all(|a| a.actor().is_launderer()));
    }

    #[test]
    fn test_banned_agent_stops() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut agents = build_population(&small(), 4320, &mut rng);
        let launderer = agents.last_mut().unwrap();
        launderer.actor().try_ban(0);

        for t in 0..100 {
            assert_eq!(launderer.tick(t), 0);
        }
        assert_eq!(launderer.actor().tx_count(), 0);
    }

    #[test]
    fn test_candidate_pool_composition() {
        let pool = build_candidates(&CandidateConfig::default());
        assert_eq!(pool.len(), 30);
        let colluding = pool
            .candidates()
            .iter()
            .filter(|c| c.honesty() == Honesty::Colluding)
            .count();
        assert_eq!(colluding, 3);
        assert!(pool.candidates().iter().all(|c| c.weight() == 1000.0));
    }
}
