//! Review ledger - the period's decision and ground-truth history
//!
//! Each review reserves a slot up front. Votes carry the slot's ticket, so a
//! member's votes stay aligned with the decision they were cast for even when
//! reviews finish out of order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Index of one review within the current period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewTicket(pub usize);

/// Committee decision and ground truth for one review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Committee verdict (`true` = ban)
    pub decision: bool,
    /// Whether the subject actually was a launderer
    pub truth: bool,
}

#[derive(Debug, Default)]
pub struct ReviewLedger {
    slots: Mutex<Vec<Option<ReviewRecord>>>,
}

impl ReviewLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a review about to start
    pub fn open(&self) -> ReviewTicket {
        let mut slots = self.slots();
        slots.push(None);
        ReviewTicket(slots.len() - 1)
    }

    /// Record the outcome of a review
    pub fn close(&self, ticket: ReviewTicket, decision: bool, truth: bool) {
        if let Some(slot) = self.slots().get_mut(ticket.0) {
            *slot = Some(ReviewRecord { decision, truth });
        }
    }

    /// Outcome of a closed review
    pub fn get(&self, ticket: ReviewTicket) -> Option<ReviewRecord> {
        self.slots().get(ticket.0).copied().flatten()
    }

    /// All closed reviews, in ticket order
    pub fn closed(&self) -> Vec<(ReviewTicket, ReviewRecord)> {
        self.slots()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|r| (ReviewTicket(i), r)))
            .collect()
    }

    /// Number of closed reviews
    pub fn len(&self) -> usize {
        self.slots().iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new period
    pub fn clear(&self) {
        self.slots().clear();
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Option<ReviewRecord>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
