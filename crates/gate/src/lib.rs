//! Tollgate Judgment Gate
//!
//! Audits screener-flagged actors through the Judgment Oracle:
//!
//! ```text
//! flagged actors
//!        │ skip dead / exempt
//!        ▼
//! ┌─────────────────┐
//! │ Semaphore (3)   │──► re-check exempt before dispatch
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Oracle + retry  │──► exhausted? FailPolicy default
//! └────────┬────────┘
//!          ▼
//!   re-check exempt ──► stale verdict discarded
//!          │
//!          ▼
//!    ban ⇒ escalate to committee
//! ```

mod config;
mod gate;

pub use config::GateConfig;
pub use gate::{AuditResult, GateOutcome, JudgmentGate};
