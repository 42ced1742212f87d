//! Behavior policies - the per-minute transaction feed
//!
//! Each live actor's behavior is asked once per simulated minute which
//! transfers to make. Probability tables are fixed per behavior.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tollgate_core::Denomination;

/// Mandate left below this counts as finished
const MANDATE_EPSILON: f64 = 1e-9;

const RETAIL_COUNTS: [(usize, f64); 2] = [(1, 0.85), (2, 0.15)];
const RETAIL_AMOUNTS: [(f64, f64); 3] = [(0.1, 0.6), (1.0, 0.3), (10.0, 0.1)];

const EXCHANGE_COUNTS: [(usize, f64); 4] = [(1, 0.3), (2, 0.3), (4, 0.25), (6, 0.15)];
const EXCHANGE_FIRST_AMOUNTS: [(f64, f64); 4] =
    [(0.1, 0.1), (1.0, 0.2), (10.0, 0.5), (100.0, 0.2)];
const EXCHANGE_NEXT_AMOUNTS: [(f64, f64); 4] =
    [(0.1, 0.3), (1.0, 0.35), (10.0, 0.25), (100.0, 0.1)];

const LAUNDERER_SEND_PROBABILITY: f64 = 0.35;
const LAUNDERER_COUNTS: [(usize, f64); 4] = [(2, 0.3), (5, 0.4), (6, 0.2), (9, 0.1)];
const LAUNDERER_AMOUNTS: [(f64, f64); 4] =
    [(0.1, 0.1), (1.0, 0.2), (10.0, 0.4), (100.0, 0.3)];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Behavior {
    /// Occasional small transfers
    Retail { rate: f64 },
    /// Frequent transfers of mixed size
    Exchange { rate: f64 },
    /// Works down its mandate in bursts until `deadline`
    RuleLaunderer { deadline: u32 },
}

impl Behavior {
    /// Transfers for minute `now`
    ///
    /// `remaining` is the actor's outstanding mandate, if it has one.
    pub fn decide<R: Rng>(&self, now: u32, remaining: Option<f64>, rng: &mut R) -> Vec<f64> {
        match *self {
            Behavior::Retail { rate } => {
                if rng.gen::<f64>() >= rate {
                    return Vec::new();
                }
                let count = pick(&RETAIL_COUNTS, rng, 1);
                (0..count).map(|_| pick(&RETAIL_AMOUNTS, rng, 0.1)).collect()
            }
            Behavior::Exchange { rate } => {
                if rng.gen::<f64>() > rate {
                    return Vec::new();
                }
                let count = pick(&EXCHANGE_COUNTS, rng, 1);
                (0..count)
                    .map(|i| {
                        let table = if i == 0 {
                            &EXCHANGE_FIRST_AMOUNTS
                        } else {
                            &EXCHANGE_NEXT_AMOUNTS
                        };
                        pick(table, rng, 1.0)
                    })
                    .collect()
            }
            Behavior::RuleLaunderer { deadline } => {
                let mut remaining = remaining.unwrap_or(0.0);
                if remaining <= MANDATE_EPSILON || now >= deadline {
                    return Vec::new();
                }
                if rng.gen::<f64>() > LAUNDERER_SEND_PROBABILITY {
                    return Vec::new();
                }

                let count = pick(&LAUNDERER_COUNTS, rng, 2);
                let mut amounts = Vec::with_capacity(count);
                for _ in 0..count {
                    if remaining <= MANDATE_EPSILON {
                        break;
                    }
                    let mut amount = pick(&LAUNDERER_AMOUNTS, rng, 10.0);
                    if amount > remaining {
                        amount = Denomination::largest_within(remaining)
                            .map_or(remaining, |d| d.value());
                    }
                    remaining -= amount;
                    amounts.push(amount);
                }
                amounts
            }
        }
    }
}

/// Weighted pick from a constant table
fn pick<T: Copy, R: Rng>(table: &[(T, f64)], rng: &mut R, fallback: T) -> T {
    table
        .choose_weighted(rng, |(_, w)| *w)
        .map_or(fallback, |(value, _)| *value)
}
