//! Denomination - the fixed set of allowed transfer amounts
//!
//! Amounts arrive as `f64`, so matching against a denomination uses a relative
//! tolerance instead of exact equality.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Relative tolerance used when matching a raw amount to a denomination
pub const DENOMINATION_TOLERANCE: f64 = 1e-5;

/// Canonical transfer denominations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Denomination {
    #[strum(serialize = "0.1")]
    Tenth,
    #[strum(serialize = "1")]
    One,
    #[strum(serialize = "10")]
    Ten,
    #[strum(serialize = "100")]
    Hundred,
}

impl Denomination {
    /// All denominations, smallest first
    pub const ALL: [Denomination; 4] = [
        Denomination::Tenth,
        Denomination::One,
        Denomination::Ten,
        Denomination::Hundred,
    ];

    /// Numeric value of the denomination
    pub const fn value(self) -> f64 {
        match self {
            Denomination::Tenth => 0.1,
            Denomination::One => 1.0,
            Denomination::Ten => 10.0,
            Denomination::Hundred => 100.0,
        }
    }

    /// Position in [`Denomination::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Denomination::Tenth => 0,
            Denomination::One => 1,
            Denomination::Ten => 2,
            Denomination::Hundred => 3,
        }
    }

    /// The largest denomination
    pub const fn max() -> Self {
        Denomination::Hundred
    }

    /// Find the denomination matching `amount` within [`DENOMINATION_TOLERANCE`]
    pub fn matching(amount: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| is_close(amount, d.value(), DENOMINATION_TOLERANCE))
    }

    /// Largest denomination not exceeding `budget`
    pub fn largest_within(budget: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .rev()
            .find(|d| d.value() <= budget + DENOMINATION_TOLERANCE)
    }
}

fn is_close(a: f64, b: f64, rel_tol: f64) -> bool {
    (a - b).abs() <= rel_tol * a.abs().max(b.abs())
}
