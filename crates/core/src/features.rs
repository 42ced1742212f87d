//! Feature Aggregator - streaming per-actor sufficient statistics
//!
//! `record()` is O(1): amounts and inter-arrival intervals feed Welford
//! accumulators, so mean/std never need a second pass over the history. The
//! raw value list is kept only for the exact median, which is sorted lazily
//! when a vector is requested after new data arrived.
//!
//! [`FeatureVector::from_transactions`] is an independent two-pass rescan used
//! to verify the streaming path.

use serde::{Deserialize, Serialize};

use crate::denomination::Denomination;
use crate::transaction::Transaction;

/// Number of features in a [`FeatureVector`]
pub const FEATURE_COUNT: usize = 24;

/// Feature names, in [`FeatureVector::to_array`] order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "total_tx",
    "value_mean",
    "value_median",
    "value_std",
    "value_min",
    "value_max",
    "value_sum",
    "value_cv",
    "time_span_hours",
    "tx_per_hour",
    "avg_interval",
    "min_interval",
    "max_interval",
    "std_interval",
    "amount_0_1",
    "amount_1",
    "amount_10",
    "amount_100",
    "amount_other",
    "pct_0_1",
    "pct_1",
    "pct_10",
    "pct_100",
    "pct_other",
];

/// Fixed-schema numeric summary of one actor's transaction stream
///
/// Intervals are in minutes. Standard deviations are population standard
/// deviations. With zero or one transaction every interval and variance field
/// is `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub total_tx: f64,
    pub value_mean: f64,
    pub value_median: f64,
    pub value_std: f64,
    pub value_min: f64,
    pub value_max: f64,
    pub value_sum: f64,
    pub value_cv: f64,
    pub time_span_hours: f64,
    pub tx_per_hour: f64,
    pub avg_interval: f64,
    pub min_interval: f64,
    pub max_interval: f64,
    pub std_interval: f64,
    pub amount_0_1: f64,
    pub amount_1: f64,
    pub amount_10: f64,
    pub amount_100: f64,
    pub amount_other: f64,
    pub pct_0_1: f64,
    pub pct_1: f64,
    pub pct_10: f64,
    pub pct_100: f64,
    pub pct_other: f64,
}

impl FeatureVector {
    /// Flatten in [`FEATURE_NAMES`] order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.total_tx,
            self.value_mean,
            self.value_median,
            self.value_std,
            self.value_min,
            self.value_max,
            self.value_sum,
            self.value_cv,
            self.time_span_hours,
            self.tx_per_hour,
            self.avg_interval,
            self.min_interval,
            self.max_interval,
            self.std_interval,
            self.amount_0_1,
            self.amount_1,
            self.amount_10,
            self.amount_100,
            self.amount_other,
            self.pct_0_1,
            self.pct_1,
            self.pct_10,
            self.pct_100,
            self.pct_other,
        ]
    }

    /// Rebuild from a full rescan of `transactions` (two-pass, non-streaming)
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut txs = transactions.to_vec();
        txs.sort_by_key(|t| t.time);

        let n = txs.len();
        if n == 0 {
            return Self::default();
        }
        let nf = n as f64;

        let values: Vec<f64> = txs.iter().map(|t| t.amount).collect();
        let sum: f64 = values.iter().sum();
        let mean = sum / nf;
        let std = population_std(&values, mean);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let intervals: Vec<f64> = txs
            .windows(2)
            .map(|w| f64::from(w[1].time - w[0].time))
            .collect();
        let interval_mean = if intervals.is_empty() {
            0.0
        } else {
            intervals.iter().sum::<f64>() / intervals.len() as f64
        };

        let mut histogram = DenominationHistogram::default();
        for v in &values {
            histogram.add(*v);
        }

        let span = f64::from(txs[n - 1].time - txs[0].time);

        Self::assemble(Summary {
            count: n as u64,
            sum,
            mean,
            median: median(values),
            std,
            min,
            max,
            span_minutes: span,
            interval_mean,
            interval_min: intervals.iter().copied().fold(f64::INFINITY, f64::min),
            interval_max: intervals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            interval_std: population_std(&intervals, interval_mean),
            interval_count: intervals.len() as u64,
            histogram,
        })
    }

    fn assemble(s: Summary) -> Self {
        if s.count == 0 {
            return Self::default();
        }
        let n = s.count as f64;
        let has_intervals = s.interval_count > 0;
        let hours = if s.span_minutes > 0.0 {
            s.span_minutes / 60.0
        } else {
            1.0
        };
        let counts = s.histogram.counts;
        let other = s.histogram.other as f64;

        Self {
            total_tx: n,
            value_mean: s.mean,
            value_median: s.median,
            value_std: if s.count > 1 { s.std } else { 0.0 },
            value_min: s.min,
            value_max: s.max,
            value_sum: s.sum,
            value_cv: if s.mean > 0.0 && s.count > 1 {
                s.std / s.mean
            } else {
                0.0
            },
            time_span_hours: s.span_minutes / 60.0,
            tx_per_hour: n / hours,
            avg_interval: if has_intervals { s.interval_mean } else { 0.0 },
            min_interval: if has_intervals { s.interval_min } else { 0.0 },
            max_interval: if has_intervals { s.interval_max } else { 0.0 },
            std_interval: if s.interval_count > 1 {
                s.interval_std
            } else {
                0.0
            },
            amount_0_1: counts[0] as f64,
            amount_1: counts[1] as f64,
            amount_10: counts[2] as f64,
            amount_100: counts[3] as f64,
            amount_other: other,
            pct_0_1: counts[0] as f64 / n,
            pct_1: counts[1] as f64 / n,
            pct_10: counts[2] as f64 / n,
            pct_100: counts[3] as f64 / n,
            pct_other: other / n,
        }
    }
}

/// Intermediate summary shared by the streaming and rescan paths
struct Summary {
    count: u64,
    sum: f64,
    mean: f64,
    median: f64,
    std: f64,
    min: f64,
    max: f64,
    span_minutes: f64,
    interval_mean: f64,
    interval_min: f64,
    interval_max: f64,
    interval_std: f64,
    interval_count: u64,
    histogram: DenominationHistogram,
}

/// Welford accumulator for count/mean/variance plus sum and extrema
#[derive(Debug, Clone, Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    sum: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    fn push(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        if self.count == 1 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn std(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0).sqrt()
    }
}

/// Per-denomination counts with a catch-all bucket
#[derive(Debug, Clone, Copy, Default)]
struct DenominationHistogram {
    counts: [u64; 4],
    other: u64,
}

impl DenominationHistogram {
    fn add(&mut self, amount: f64) {
        match Denomination::matching(amount) {
            Some(d) => self.counts[d.index()] += 1,
            None => self.other += 1,
        }
    }
}

/// Incrementally maintained sufficient statistics for one actor
#[derive(Debug, Clone, Default)]
pub struct FeatureAggregator {
    amounts: RunningStats,
    intervals: RunningStats,
    values: Vec<f64>,
    first_time: Option<u32>,
    last_time: Option<u32>,
    histogram: DenominationHistogram,
    cached: Option<FeatureVector>,
}

impl FeatureAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an aggregator by replaying `transactions` in time order
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut txs = transactions.to_vec();
        txs.sort_by_key(|t| t.time);
        let mut aggregator = Self::new();
        for tx in txs {
            aggregator.record(tx.amount, tx.time);
        }
        aggregator
    }

    /// Rebuild a vector from scratch, bypassing the streaming state
    pub fn rescan(transactions: &[Transaction]) -> FeatureVector {
        FeatureVector::from_transactions(transactions)
    }

    /// Record one transfer in O(1)
    pub fn record(&mut self, amount: f64, time: u32) {
        self.amounts.push(amount);
        self.values.push(amount);
        self.histogram.add(amount);

        match self.last_time {
            Some(last) => {
                if time < last {
                    tracing::warn!(time, last, "Out-of-order transaction, interval clamped to 0");
                }
                self.intervals.push(f64::from(time.saturating_sub(last)));
                self.last_time = Some(last.max(time));
            }
            None => self.last_time = Some(time),
        }
        self.first_time = Some(self.first_time.map_or(time, |first| first.min(time)));

        self.cached = None;
    }

    /// Number of recorded transfers
    pub fn count(&self) -> u64 {
        self.amounts.count
    }

    /// Total recorded volume
    pub fn volume(&self) -> f64 {
        self.amounts.sum
    }

    /// Minutes between first and last transfer
    pub fn span_minutes(&self) -> u32 {
        match (self.first_time, self.last_time) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }

    /// Current feature vector, recomputed only when new data arrived
    pub fn features(&mut self) -> FeatureVector {
        if let Some(cached) = self.cached {
            return cached;
        }
        let vector = FeatureVector::assemble(Summary {
            count: self.amounts.count,
            sum: self.amounts.sum,
            mean: self.amounts.mean,
            median: median(self.values.clone()),
            std: self.amounts.std(),
            min: self.amounts.min,
            max: self.amounts.max,
            span_minutes: f64::from(self.span_minutes()),
            interval_mean: self.intervals.mean,
            interval_min: self.intervals.min,
            interval_max: self.intervals.max,
            interval_std: self.intervals.std(),
            interval_count: self.intervals.count,
            histogram: self.histogram,
        });
        self.cached = Some(vector);
        vector
    }
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vectors_close(a: &FeatureVector, b: &FeatureVector) {
        for (i, (x, y)) in a.to_array().iter().zip(b.to_array().iter()).enumerate() {
            let tol = 1e-9 * x.abs().max(y.abs()).max(1.0);
            assert!(
                (x - y).abs() <= tol,
                "{} differs: streaming={} rescan={}",
                FEATURE_NAMES[i],
                x,
                y
            );
        }
    }

    #[test]
    fn test_empty_aggregator() {
        let mut agg = FeatureAggregator::new();
        let v = agg.features();
        assert_eq!(v, FeatureVector::default());
        assert!(v.to_array().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_single_transaction_has_zero_spread() {
        let mut agg = FeatureAggregator::new();
        agg.record(10.0, 7);
        let v = agg.features();

        assert_eq!(v.total_tx, 1.0);
        assert_eq!(v.value_mean, 10.0);
        assert_eq!(v.value_median, 10.0);
        assert_eq!(v.value_std, 0.0);
        assert_eq!(v.avg_interval, 0.0);
        assert_eq!(v.min_interval, 0.0);
        assert_eq!(v.max_interval, 0.0);
        assert_eq!(v.std_interval, 0.0);
        assert_eq!(v.time_span_hours, 0.0);
        assert_eq!(v.tx_per_hour, 1.0);
        assert_eq!(v.amount_10, 1.0);
        assert_eq!(v.pct_10, 1.0);
        assert!(v.to_array().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_streaming_matches_rescan() {
        let txs: Vec<Transaction> = [
            (0, 0.1),
            (3, 1.0),
            (3, 10.0),
            (9, 100.0),
            (15, 0.1),
            (40, 1.0),
            (41, 7.5),
            (90, 10.0),
            (91, 100.0),
            (200, 0.1 + 0.2 - 0.2),
        ]
        .into_iter()
        .map(Transaction::from)
        .collect();

        let mut agg = FeatureAggregator::new();
        // Every prefix must agree, not just the final state
        for (i, tx) in txs.iter().enumerate() {
            agg.record(tx.amount, tx.time);
            assert_vectors_close(&agg.features(), &FeatureVector::from_transactions(&txs[..=i]));
        }
    }

    #[test]
    fn test_streaming_matches_rescan_long_stream() {
        // Large uniform stream stresses the Welford update
        let txs: Vec<Transaction> = (0..5_000u32)
            .map(|i| {
                let amount = Denomination::ALL[(i as usize * 7) % 4].value();
                Transaction::new(i * 2 + (i % 3), amount)
            })
            .collect();

        let mut agg = FeatureAggregator::new();
        for tx in &txs {
            agg.record(tx.amount, tx.time);
        }
        assert_vectors_close(&agg.features(), &FeatureVector::from_transactions(&txs));
    }

    #[test]
    fn test_histogram_other_bucket() {
        let mut agg = FeatureAggregator::new();
        agg.record(100.0, 0);
        agg.record(3.0, 1);
        agg.record(100.0, 2);
        agg.record(42.0, 3);
        let v = agg.features();

        assert_eq!(v.amount_100, 2.0);
        assert_eq!(v.amount_other, 2.0);
        assert_eq!(v.pct_100, 0.5);
        assert_eq!(v.pct_other, 0.5);
    }

    #[test]
    fn test_interval_statistics() {
        let mut agg = FeatureAggregator::new();
        for t in [0, 1, 2, 3, 60] {
            agg.record(1.0, t);
        }
        let v = agg.features();

        assert_eq!(v.min_interval, 1.0);
        assert_eq!(v.max_interval, 57.0);
        assert_eq!(v.avg_interval, 15.0);
        assert_eq!(v.time_span_hours, 1.0);
        assert_eq!(v.tx_per_hour, 5.0);
        assert!(v.std_interval > 0.0);
    }

    #[test]
    fn test_cache_invalidated_on_record() {
        let mut agg = FeatureAggregator::new();
        agg.record(1.0, 0);
        let before = agg.features();
        agg.record(100.0, 1);
        let after = agg.features();

        assert_ne!(before, after);
        assert_eq!(after.total_tx, 2.0);
        assert_eq!(after.value_median, 50.5);
    }

    #[test]
    fn test_out_of_order_clamps_interval() {
        let mut agg = FeatureAggregator::new();
        agg.record(1.0, 10);
        agg.record(1.0, 5);
        let v = agg.features();

        assert_eq!(v.min_interval, 0.0);
        assert_eq!(agg.span_minutes(), 5);
        assert!(v.to_array().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_from_transactions_sorts() {
        let txs = vec![Transaction::new(5, 1.0), Transaction::new(0, 10.0)];
        let mut agg = FeatureAggregator::from_transactions(&txs);
        let v = agg.features();
        assert_eq!(v.avg_interval, 5.0);
        assert_eq!(agg.count(), 2);
        assert_eq!(agg.volume(), 11.0);
    }
}
