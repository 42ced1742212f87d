//! Tollgate Core - Domain types
//!
//! This crate contains the fundamental types shared by every pipeline stage:
//! - [`Denomination`]: the fixed set of allowed transfer amounts
//! - [`Transaction`]: an immutable `(time, amount)` record
//! - [`FeatureAggregator`] / [`FeatureVector`]: streaming per-actor statistics
//! - [`Actor`]: a screened participant with race-free ban/exempt transitions
//! - [`ExemplarSet`]: reference histories of legitimate and illegal behavior

pub mod actor;
pub mod denomination;
pub mod error;
pub mod exemplar;
pub mod features;
pub mod transaction;

pub use actor::{Actor, ActorId, ActorKind, ActorStatus, Mandate};
pub use denomination::{Denomination, DENOMINATION_TOLERANCE};
pub use error::{CoreError, CoreResult};
pub use exemplar::ExemplarSet;
pub use features::{FeatureAggregator, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use transaction::Transaction;
