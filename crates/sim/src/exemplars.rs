//! Reference exemplar generation
//!
//! Runs a small set of reference actors (three retail, one exchange, one
//! launderer) outside the screened population and keeps their histories.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use tollgate_core::{Actor, ActorId, ActorKind, ExemplarSet};

use crate::behavior::Behavior;
use crate::config::{PopulationConfig, SimConfig};
use crate::error::SimResult;
use crate::population::Agent;

const REFERENCE_RETAIL: u32 = 3;

/// Run the reference actors for `minutes` minutes
pub fn generate_exemplars(population: &PopulationConfig, minutes: u32, seed: u64) -> ExemplarSet {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut legitimate: Vec<Agent> = (0..REFERENCE_RETAIL)
        .map(|i| {
            let actor = Actor::new(ActorId(i), ActorKind::Retail);
            let behavior = Behavior::Retail { rate: population.retail_rate };
            Agent::new(actor.into(), behavior, rng.gen())
        })
        .collect();
    legitimate.push(Agent::new(
        Actor::new(ActorId(REFERENCE_RETAIL), ActorKind::Exchange).into(),
        Behavior::Exchange { rate: population.exchange_rate },
        rng.gen(),
    ));

    let mut illegal = Agent::new(
        Actor::with_mandate(
            ActorId(REFERENCE_RETAIL + 1),
            ActorKind::Launderer,
            population.small_mandate,
        )
        .into(),
        Behavior::RuleLaunderer { deadline: minutes },
        rng.gen(),
    );

    for now in 0..minutes {
        for agent in legitimate.iter_mut() {
            agent.tick(now);
        }
        illegal.tick(now);
    }

    let exemplars = ExemplarSet::new(
        legitimate.iter().map(|a| a.actor().history()).collect(),
        vec![illegal.actor().history()],
    );
    info!(
        minutes,
        legitimate = exemplars.legitimate.len(),
        illegal = exemplars.illegal.len(),
        illegal_tx = exemplars.illegal[0].len(),
        "Exemplars generated"
    );
    exemplars
}

/// Load exemplars from `path`, or generate and save them there
pub fn load_or_generate(path: impl AsRef<Path>, config: &SimConfig) -> SimResult<ExemplarSet> {
    let path = path.as_ref();
    if path.exists() {
        let exemplars = ExemplarSet::from_file(path)?;
        info!(path = %path.display(), count = exemplars.len(), "Exemplars loaded");
        return Ok(exemplars);
    }

    let exemplars = generate_exemplars(
        &config.population,
        config.schedule.exemplar_minutes,
        config.seed,
    );
    exemplars.save(path)?;
    Ok(exemplars)
}
