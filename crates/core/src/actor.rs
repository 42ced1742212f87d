//! Actor - a screened participant
//!
//! The status word is the only state the pipeline stages race on. Transitions
//! go through compare-and-swap from `Active`, so once an actor is exempt no
//! later ban can land on it and a banned actor can never be exempted.
//!
//! The ledger (transactions, aggregator, laundering mandate) lives behind a
//! mutex that is never held across an `.await`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::features::{FeatureAggregator, FeatureVector};
use crate::transaction::Transaction;

/// Unique actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

/// Ground-truth behavior tag
///
/// Only evaluation code (statistics, colluding affiliation) reads this; the
/// screener and the gate never see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActorKind {
    Retail,
    Exchange,
    Launderer,
}

impl ActorKind {
    pub fn is_launderer(self) -> bool {
        matches!(self, ActorKind::Launderer)
    }
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum ActorStatus {
    Active = 0,
    Exempt = 1,
    Banned = 2,
}

impl ActorStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ActorStatus::Exempt,
            2 => ActorStatus::Banned,
            _ => ActorStatus::Active,
        }
    }
}

/// Outstanding laundering task
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mandate {
    pub initial: f64,
    pub remaining: f64,
}

impl Mandate {
    pub fn new(amount: f64) -> Self {
        Self {
            initial: amount,
            remaining: amount,
        }
    }

    /// Fraction of the task already moved, in `[0, 1]`
    pub fn progress_ratio(&self) -> f64 {
        if self.initial <= 0.0 {
            return 1.0;
        }
        ((self.initial - self.remaining) / self.initial).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining <= 0.0
    }
}

#[derive(Debug, Default)]
struct Ledger {
    transactions: Vec<Transaction>,
    aggregator: FeatureAggregator,
    mandate: Option<Mandate>,
    banned_at: Option<u32>,
}

/// A simulated participant
#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    kind: ActorKind,
    created_at: u32,
    status: AtomicU8,
    ledger: Mutex<Ledger>,
}

impl Actor {
    pub fn new(id: ActorId, kind: ActorKind) -> Self {
        Self {
            id,
            kind,
            created_at: 0,
            status: AtomicU8::new(ActorStatus::Active as u8),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Create an actor carrying a laundering mandate
    pub fn with_mandate(id: ActorId, kind: ActorKind, amount: f64) -> Self {
        let actor = Self::new(id, kind);
        actor.ledger().mandate = Some(Mandate::new(amount));
        actor
    }

    /// Set the minute the actor joined the simulation
    pub fn created_at(mut self, minute: u32) -> Self {
        self.created_at = minute;
        self
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn is_launderer(&self) -> bool {
        self.kind.is_launderer()
    }

    pub fn status(&self) -> ActorStatus {
        ActorStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_alive(&self) -> bool {
        self.status() != ActorStatus::Banned
    }

    pub fn is_exempt(&self) -> bool {
        self.status() == ActorStatus::Exempt
    }

    /// Ban the actor unless it is already exempt or banned
    ///
    /// Returns `true` only if this call performed the transition.
    pub fn try_ban(&self, now: u32) -> bool {
        let swapped = self.transition(ActorStatus::Banned);
        if swapped {
            self.ledger().banned_at = Some(now);
        }
        swapped
    }

    /// Exempt the actor unless it is already exempt or banned
    pub fn try_exempt(&self) -> bool {
        self.transition(ActorStatus::Exempt)
    }

    fn transition(&self, to: ActorStatus) -> bool {
        self.status
            .compare_exchange(
                ActorStatus::Active as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Record one transfer
    ///
    /// Refused (returns `false`) once the actor is banned. A mandate, if any,
    /// is drawn down by the amount.
    pub fn record(&self, amount: f64, time: u32) -> bool {
        if !self.is_alive() {
            return false;
        }
        let mut ledger = self.ledger();
        ledger.transactions.push(Transaction::new(time, amount));
        ledger.aggregator.record(amount, time);
        if let Some(mandate) = ledger.mandate.as_mut() {
            mandate.remaining = (mandate.remaining - amount).max(0.0);
        }
        true
    }

    /// Current feature vector (cached between records)
    pub fn features(&self) -> FeatureVector {
        self.ledger().aggregator.features()
    }

    /// Full transaction history
    pub fn history(&self) -> Vec<Transaction> {
        self.ledger().transactions.clone()
    }

    /// Last `n` transactions
    pub fn recent_history(&self, n: usize) -> Vec<Transaction> {
        let ledger = self.ledger();
        let start = ledger.transactions.len().saturating_sub(n);
        ledger.transactions[start..].to_vec()
    }

    pub fn mandate(&self) -> Option<Mandate> {
        self.ledger().mandate
    }

    /// Minutes survived so far, or until the ban
    pub fn survival_minutes(&self, now: u32) -> u32 {
        let end = self.ledger().banned_at.unwrap_or(now);
        end.saturating_sub(self.created_at)
    }

    /// Minutes between the first and last recorded transfer
    pub fn activity_span(&self) -> u32 {
        self.ledger().aggregator.span_minutes()
    }

    pub fn banned_at(&self) -> Option<u32> {
        self.ledger().banned_at
    }

    /// Total volume moved
    pub fn volume(&self) -> f64 {
        self.ledger().aggregator.volume()
    }

    pub fn tx_count(&self) -> u64 {
        self.ledger().aggregator.count()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
