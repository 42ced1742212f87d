//! Tollgate Stats - Statistics Collector
//!
//! Turns each audit round's screener flags, gate verdicts and committee
//! verdicts into per-stage precision/recall, running totals and
//! auditor-vs-committee consistency figures. Records can be persisted to an
//! append-only JSONL [`StatsLedger`].
//!
//! Every ratio whose denominator is zero is reported as exactly `0.0`.

pub mod collector;
pub mod error;
pub mod ledger;
pub mod metrics;

pub use collector::{
    CumulativePrecision, Report, RoundOutcome, RoundRecord, RunSummary, StatsCollector,
    VolumePoint,
};
pub use error::{StatsError, StatsResult};
pub use ledger::{StatsEntry, StatsLedger};
pub use metrics::{ratio, Inconsistency, InconsistencyReport, StageMetrics, Subject, Verdict};
