//! Transaction - a single recorded transfer

use serde::{Deserialize, Serialize};

use crate::denomination::Denomination;

/// An immutable transfer record
///
/// `time` is a simulated minute index. Ordering by `time` matters for
/// interval statistics; within one actor times are non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub time: u32,
    pub amount: f64,
}

impl Transaction {
    pub fn new(time: u32, amount: f64) -> Self {
        Self { time, amount }
    }

    /// Matching canonical denomination, if any
    pub fn denomination(&self) -> Option<Denomination> {
        Denomination::matching(self.amount)
    }
}

impl From<(u32, f64)> for Transaction {
    fn from((time, amount): (u32, f64)) -> Self {
        Self { time, amount }
    }
}
