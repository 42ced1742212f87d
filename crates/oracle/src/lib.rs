//! Tollgate Judgment Oracle
//!
//! The gate and the committee depend only on the [`JudgmentOracle`] trait.
//! Ships a deterministic [`RuleOracle`] and a [`ScriptedOracle`] test double;
//! remote backends implement the same trait.

mod error;
mod policy;
mod rule;
mod scripted;
mod types;

pub use error::OracleError;
pub use policy::{FailPolicy, RetryPolicy};
pub use rule::{RuleOracle, SuspicionRule};
pub use scripted::ScriptedOracle;
pub use types::{Judgment, JudgmentContext, JudgmentOracle, JudgmentRequest, TeammateContext};
