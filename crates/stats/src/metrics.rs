//! Per-stage metrics and consistency figures

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tollgate_core::ActorId;

/// `numerator / denominator`, or `0.0` when the denominator is zero
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// An actor handed to a stage, tagged with its ground truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub actor: ActorId,
    pub launderer: bool,
}

impl Subject {
    pub fn new(actor: ActorId, launderer: bool) -> Self {
        Self { actor, launderer }
    }
}

/// A stage's decision on one subject (`ban == true` means the stage wants the
/// subject stopped)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub subject: Subject,
    pub ban: bool,
}

impl Verdict {
    pub fn new(actor: ActorId, launderer: bool, ban: bool) -> Self {
        Self {
            subject: Subject::new(actor, launderer),
            ban,
        }
    }
}

/// Precision and recall of one stage in one round
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Subjects the stage passed on as suspicious
    pub flagged: usize,
    /// Launderers among them
    pub caught: usize,
    /// Launderers the stage could have caught
    pub eligible: usize,
    pub precision: f64,
    pub recall: f64,
}

impl StageMetrics {
    pub fn new(flagged: usize, caught: usize, eligible: usize) -> Self {
        Self {
            flagged,
            caught,
            eligible,
            precision: ratio(caught, flagged),
            recall: ratio(caught, eligible),
        }
    }
}

/// How often the committee overturned the auditor on one population
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Inconsistency {
    /// Subjects the auditor decided on
    pub auditor_judged: usize,
    /// Subjects the committee decided on
    pub committee_judged: usize,
    /// Subjects both decided on
    pub comparable: usize,
    /// Comparable subjects where the two disagree
    pub inconsistent: usize,
    pub ratio: f64,
}

/// Auditor-vs-committee disagreement, overall and per ground-truth class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InconsistencyReport {
    pub overall: Inconsistency,
    pub legitimate: Inconsistency,
    pub launderer: Inconsistency,
}

impl InconsistencyReport {
    pub fn compute(auditor: &[Verdict], committee: &[Verdict]) -> Self {
        let auditor_by_actor: HashMap<ActorId, bool> =
            auditor.iter().map(|v| (v.subject.actor, v.ban)).collect();

        Self {
            overall: inconsistency(auditor, &auditor_by_actor, committee, |_| true),
            legitimate: inconsistency(auditor, &auditor_by_actor, committee, |s| !s.launderer),
            launderer: inconsistency(auditor, &auditor_by_actor, committee, |s| s.launderer),
        }
    }
}

fn inconsistency(
    auditor: &[Verdict],
    auditor_by_actor: &HashMap<ActorId, bool>,
    committee: &[Verdict],
    in_population: impl Fn(&Subject) -> bool,
) -> Inconsistency {
    let mut out = Inconsistency {
        auditor_judged: auditor.iter().filter(|v| in_population(&v.subject)).count(),
        ..Default::default()
    };
    for verdict in committee.iter().filter(|v| in_population(&v.subject)) {
        out.committee_judged += 1;
        if let Some(&auditor_ban) = auditor_by_actor.get(&verdict.subject.actor) {
            out.comparable += 1;
            if auditor_ban != verdict.ban {
                out.inconsistent += 1;
            }
        }
    }
    out.ratio = ratio(out.inconsistent, out.comparable);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(5, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }

    #[test]
    fn test_stage_metrics() {
        let m = StageMetrics::new(4, 3, 6);
        assert_eq!(m.precision, 0.75);
        assert_eq!(m.recall, 0.5);

        let empty = StageMetrics::new(0, 0, 0);
        assert_eq!(empty.precision, 0.0);
        assert_eq!(empty.recall, 0.0);
    }

    #[test]
    fn test_inconsistency_split_by_class() {
        let auditor = vec![
            Verdict::new(ActorId(1), false, true),
            Verdict::new(ActorId(2), true, true),
            Verdict::new(ActorId(3), true, true),
            Verdict::new(ActorId(4), false, false),
        ];
        let committee = vec![
            Verdict::new(ActorId(1), false, false),
            Verdict::new(ActorId(2), true, true),
            Verdict::new(ActorId(3), true, false),
        ];

        let report = InconsistencyReport::compute(&auditor, &committee);

        assert_eq!(report.overall.auditor_judged, 4);
        assert_eq!(report.overall.committee_judged, 3);
        assert_eq!(report.overall.comparable, 3);
        assert_eq!(report.overall.inconsistent, 2);

        assert_eq!(report.legitimate.auditor_judged, 2);
        assert_eq!(report.legitimate.inconsistent, 1);
        assert_eq!(report.legitimate.ratio, 1.0);

        assert_eq!(report.launderer.comparable, 2);
        assert_eq!(report.launderer.ratio, 0.5);
    }

    #[test]
    fn test_inconsistency_without_committee() {
        let auditor = vec![Verdict::new(ActorId(1), false, false)];
        let report = InconsistencyReport::compute(&auditor, &[]);

        assert_eq!(report.overall.comparable, 0);
        assert_eq!(report.overall.ratio, 0.0);
        assert_eq!(report.launderer, Inconsistency::default());
    }
}
