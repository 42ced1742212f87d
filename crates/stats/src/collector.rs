//! Statistics Collector
//!
//! Fed once per audit round, after every gate call and committee review of
//! the round has joined. Stage recall denominators:
//!
//! | stage     | eligible launderers                    |
//! |-----------|----------------------------------------|
//! | screener  | launderers alive at the start of round |
//! | gate      | launderers among the screener flags    |
//! | committee | launderers the gate escalated          |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::metrics::{ratio, InconsistencyReport, StageMetrics, Subject, Verdict};

/// Everything one audit round produced
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    pub minute: u32,
    /// Launderers alive when screening started
    pub live_launderers: usize,
    /// Subjects the screener flagged
    pub flagged: Vec<Subject>,
    /// Gate verdicts that were applied (stale and skipped audits excluded)
    pub audited: Vec<Verdict>,
    /// Committee verdicts on escalated subjects
    pub reviewed: Vec<Verdict>,
}

/// Running precision of each stage since the start of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativePrecision {
    pub screener: f64,
    pub gate: f64,
    pub committee: f64,
}

/// Serializable per-round record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub run_id: Uuid,
    pub minute: u32,
    pub recorded_at: DateTime<Utc>,
    pub screener: StageMetrics,
    pub gate: StageMetrics,
    pub committee: StageMetrics,
    pub cumulative: CumulativePrecision,
    /// Banned launderers / all committee bans so far
    pub overall_precision: f64,
    /// Banned launderers / all launderers in the run
    pub overall_recall: f64,
    pub inconsistency: InconsistencyReport,
}

/// Total launderer volume at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub minute: u32,
    pub total: f64,
}

/// Snapshot of the collector's running totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub rounds: usize,
    pub total_launderers: usize,
    pub banned_launderers: usize,
    pub legitimate_bans: usize,
    pub cumulative: CumulativePrecision,
    pub overall_precision: f64,
    pub overall_recall: f64,
    pub transferred: Vec<VolumePoint>,
}

/// End-of-run figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub minutes: u32,
    pub legitimate_volume: f64,
    pub launderer_volume: f64,
    /// `legitimate_volume / (launderer_volume + 1)`
    pub volume_ratio: f64,
    pub banned_launderers: usize,
    pub legitimate_bans: usize,
    pub remaining_launderers: usize,
    pub overall_precision: f64,
    pub overall_recall: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    screener_flagged: usize,
    screener_caught: usize,
    gate_escalated: usize,
    gate_caught: usize,
    committee_bans: usize,
    committee_caught: usize,
}

pub struct StatsCollector {
    run_id: Uuid,
    total_launderers: usize,
    rounds: usize,
    totals: Totals,
    transferred: Vec<VolumePoint>,
}

impl StatsCollector {
    pub fn new(total_launderers: usize) -> Self {
        Self::with_run_id(Uuid::new_v4(), total_launderers)
    }

    pub fn with_run_id(run_id: Uuid, total_launderers: usize) -> Self {
        Self {
            run_id,
            total_launderers,
            rounds: 0,
            totals: Totals::default(),
            transferred: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Fold one round into the running totals and return its record
    pub fn record(&mut self, outcome: &RoundOutcome) -> RoundRecord {
        let flagged_launderers = count_launderers(&outcome.flagged);
        let screener = StageMetrics::new(
            outcome.flagged.len(),
            flagged_launderers,
            outcome.live_launderers,
        );

        let escalated: Vec<Subject> = outcome
            .audited
            .iter()
            .filter(|v| v.ban)
            .map(|v| v.subject)
            .collect();
        let escalated_launderers = count_launderers(&escalated);
        let gate = StageMetrics::new(escalated.len(), escalated_launderers, flagged_launderers);

        let bans = outcome.reviewed.iter().filter(|v| v.ban).count();
        let banned_launderers = outcome
            .reviewed
            .iter()
            .filter(|v| v.ban && v.subject.launderer)
            .count();
        let committee = StageMetrics::new(bans, banned_launderers, escalated_launderers);

        let t = &mut self.totals;
        t.screener_flagged += screener.flagged;
        t.screener_caught += screener.caught;
        t.gate_escalated += gate.flagged;
        t.gate_caught += gate.caught;
        t.committee_bans += committee.flagged;
        t.committee_caught += committee.caught;
        self.rounds += 1;

        let record = RoundRecord {
            run_id: self.run_id,
            minute: outcome.minute,
            recorded_at: Utc::now(),
            screener,
            gate,
            committee,
            cumulative: self.cumulative(),
            overall_precision: self.overall_precision(),
            overall_recall: self.overall_recall(),
            inconsistency: InconsistencyReport::compute(&outcome.audited, &outcome.reviewed),
        };

        info!(
            minute = record.minute,
            flagged = screener.flagged,
            escalated = gate.flagged,
            banned = committee.flagged,
            screener_precision = screener.precision,
            gate_precision = gate.precision,
            committee_precision = committee.precision,
            overall_precision = record.overall_precision,
            overall_recall = record.overall_recall,
            "Round recorded"
        );
        record
    }

    /// Append a launderer-volume observation
    pub fn record_volume(&mut self, minute: u32, total: f64) -> VolumePoint {
        let point = VolumePoint { minute, total };
        info!(minute, transferred = total, "Launderer volume");
        self.transferred.push(point);
        point
    }

    pub fn transferred(&self) -> &[VolumePoint] {
        &self.transferred
    }

    pub fn report(&self) -> Report {
        Report {
            run_id: self.run_id,
            rounds: self.rounds,
            total_launderers: self.total_launderers,
            banned_launderers: self.totals.committee_caught,
            legitimate_bans: self.legitimate_bans(),
            cumulative: self.cumulative(),
            overall_precision: self.overall_precision(),
            overall_recall: self.overall_recall(),
            transferred: self.transferred.clone(),
        }
    }

    pub fn summarize(
        &self,
        minutes: u32,
        legitimate_volume: f64,
        launderer_volume: f64,
        remaining_launderers: usize,
    ) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            minutes,
            legitimate_volume,
            launderer_volume,
            volume_ratio: legitimate_volume / (launderer_volume + 1.0),
            banned_launderers: self.totals.committee_caught,
            legitimate_bans: self.legitimate_bans(),
            remaining_launderers,
            overall_precision: self.overall_precision(),
            overall_recall: self.overall_recall(),
        }
    }

    fn cumulative(&self) -> CumulativePrecision {
        let t = &self.totals;
        CumulativePrecision {
            screener: ratio(t.screener_caught, t.screener_flagged),
            gate: ratio(t.gate_caught, t.gate_escalated),
            committee: ratio(t.committee_caught, t.committee_bans),
        }
    }

    fn overall_precision(&self) -> f64 {
        ratio(self.totals.committee_caught, self.totals.committee_bans)
    }

    fn overall_recall(&self) -> f64 {
        ratio(self.totals.committee_caught, self.total_launderers)
    }

    fn legitimate_bans(&self) -> usize {
        self.totals.committee_bans - self.totals.committee_caught
    }
}

fn count_launderers(subjects: &[Subject]) -> usize {
    subjects.iter().filter(|s| s.launderer).count()
}
