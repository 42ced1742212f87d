//! Simulation configuration
//!
//! Every section falls back to its defaults, so a config file only needs the
//! values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tollgate_committee::{CommitteeConfig, CommitteeError, JudgmentPolicy, ReputationConfig};
use tollgate_gate::GateConfig;
use tollgate_oracle::SuspicionRule;
use tollgate_screener::ScreenerConfig;

use crate::error::{SimError, SimResult};

/// Clock and cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between audits (never at minute 0)
    #[serde(default = "default_audit_period")]
    pub audit_period: u32,

    /// Minutes between reputation updates and committee redraws
    #[serde(default = "default_reputation_period")]
    pub reputation_period: u32,

    #[serde(default = "default_max_minutes")]
    pub max_minutes: u32,

    /// Workers sharing the per-minute behavior tick
    #[serde(default = "default_tick_concurrency")]
    pub tick_concurrency: usize,

    /// Minutes the reference actors run when exemplars are generated
    #[serde(default = "default_exemplar_minutes")]
    pub exemplar_minutes: u32,
}

fn default_audit_period() -> u32 {
    10
}

fn default_reputation_period() -> u32 {
    30
}

fn default_max_minutes() -> u32 {
    4320 // 3 days
}

fn default_tick_concurrency() -> usize {
    8
}

fn default_exemplar_minutes() -> u32 {
    600
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            audit_period: default_audit_period(),
            reputation_period: default_reputation_period(),
            max_minutes: default_max_minutes(),
            tick_concurrency: default_tick_concurrency(),
            exemplar_minutes: default_exemplar_minutes(),
        }
    }
}

/// Screened actors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    #[serde(default = "default_retail")]
    pub retail: usize,

    #[serde(default = "default_exchanges")]
    pub exchanges: usize,

    /// Exchanges allow-listed from the start (taken from the end of the list)
    #[serde(default = "default_exempt_exchanges")]
    pub exempt_exchanges: usize,

    /// Per-minute send probability of a retail actor
    #[serde(default = "default_retail_rate")]
    pub retail_rate: f64,

    /// Per-minute send probability of an exchange
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: f64,

    #[serde(default = "default_small_launderers")]
    pub small_launderers: usize,

    #[serde(default = "default_large_launderers")]
    pub large_launderers: usize,

    #[serde(default = "default_small_mandate")]
    pub small_mandate: f64,

    #[serde(default = "default_large_mandate")]
    pub large_mandate: f64,
}

fn default_retail() -> usize {
    19_980
}

fn default_exchanges() -> usize {
    20
}

fn default_exempt_exchanges() -> usize {
    14
}

fn default_retail_rate() -> f64 {
    0.003
}

fn default_exchange_rate() -> f64 {
    0.1
}

fn default_small_launderers() -> usize {
    16
}

fn default_large_launderers() -> usize {
    4
}

fn default_small_mandate() -> f64 {
    10_000.0
}

fn default_large_mandate() -> f64 {
    60_000.0
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            retail: default_retail(),
            exchanges: default_exchanges(),
            exempt_exchanges: default_exempt_exchanges(),
            retail_rate: default_retail_rate(),
            exchange_rate: default_exchange_rate(),
            small_launderers: default_small_launderers(),
            large_launderers: default_large_launderers(),
            small_mandate: default_small_mandate(),
            large_mandate: default_large_mandate(),
        }
    }
}

impl PopulationConfig {
    pub fn launderers(&self) -> usize {
        self.small_launderers + self.large_launderers
    }

    pub fn total(&self) -> usize {
        self.retail + self.exchanges + self.launderers()
    }
}

/// Committee candidate pool composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateConfig {
    #[serde(default = "default_honest")]
    pub honest: usize,

    #[serde(default = "default_colluding")]
    pub colluding: usize,

    #[serde(default = "default_judgment")]
    pub judgment: JudgmentPolicy,

    #[serde(default = "default_initial_weight")]
    pub initial_weight: f64,

    #[serde(default = "default_initial_reputation")]
    pub initial_reputation: f64,
}

fn default_honest() -> usize {
    27
}

fn default_colluding() -> usize {
    3
}

fn default_judgment() -> JudgmentPolicy {
    JudgmentPolicy::Oracle
}

fn default_initial_weight() -> f64 {
    1000.0
}

fn default_initial_reputation() -> f64 {
    1.0
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            honest: default_honest(),
            colluding: default_colluding(),
            judgment: default_judgment(),
            initial_weight: default_initial_weight(),
            initial_reputation: default_initial_reputation(),
        }
    }
}

impl CandidateConfig {
    pub fn total(&self) -> usize {
        self.honest + self.colluding
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for every random stream in the run
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub population: PopulationConfig,

    #[serde(default)]
    pub candidates: CandidateConfig,

    #[serde(default)]
    pub screener: ScreenerConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub committee: CommitteeConfig,

    #[serde(default)]
    pub reputation: ReputationConfig,

    /// Rule behind the local judgment oracle
    #[serde(default)]
    pub oracle: SuspicionRule,
}

fn default_seed() -> u64 {
    42
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            schedule: ScheduleConfig::default(),
            population: PopulationConfig::default(),
            candidates: CandidateConfig::default(),
            screener: ScreenerConfig::default(),
            gate: GateConfig::default(),
            committee: CommitteeConfig::default(),
            reputation: ReputationConfig::default(),
            oracle: SuspicionRule::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reject configurations the run cannot start with
    pub fn validate(&self) -> SimResult<()> {
        let schedule = &self.schedule;
        if schedule.audit_period == 0 || schedule.reputation_period == 0 {
            return Err(SimError::ConfigError(
                "audit_period and reputation_period must be positive".into(),
            ));
        }
        if schedule.tick_concurrency == 0 {
            return Err(SimError::ConfigError(
                "tick_concurrency must be positive".into(),
            ));
        }
        if self.gate.concurrency == 0 {
            return Err(SimError::ConfigError("gate concurrency must be positive".into()));
        }

        let population = &self.population;
        if population.exempt_exchanges > population.exchanges {
            return Err(SimError::ConfigError(format!(
                "exempt_exchanges ({}) exceeds exchanges ({})",
                population.exempt_exchanges, population.exchanges
            )));
        }
        for rate in [population.retail_rate, population.exchange_rate] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimError::ConfigError(format!(
                    "send rate {} outside [0, 1]",
                    rate
                )));
            }
        }

        let candidates = &self.candidates;
        if !(candidates.initial_weight.is_finite() && candidates.initial_weight > 0.0) {
            return Err(SimError::ConfigError(format!(
                "initial_weight must be positive, got {}",
                candidates.initial_weight
            )));
        }
        if self.committee.size > candidates.total() {
            return Err(CommitteeError::InsufficientCandidates {
                requested: self.committee.size,
                available: candidates.total(),
            }
            .into());
        }

        self.screener.validate()?;
        self.committee.validate()?;
        self.reputation.validate()?;
        Ok(())
    }
}
