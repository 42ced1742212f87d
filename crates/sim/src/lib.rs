//! Tollgate Simulator - drives the interception pipeline over a synthetic
//! population
//!
//! This crate provides the round-by-round driver and the CLI binary.

pub mod behavior;
pub mod config;
pub mod error;
pub mod exemplars;
pub mod population;
pub mod simulator;

pub use behavior::Behavior;
pub use config::{CandidateConfig, PopulationConfig, ScheduleConfig, SimConfig};
pub use error::{SimError, SimResult};
pub use exemplars::{generate_exemplars, load_or_generate};
pub use population::{build_candidates, build_population, Agent};
pub use simulator::{AuditReport, Simulator};
