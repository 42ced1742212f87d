//! Tollgate Committee - reputation-weighted consensus on escalated actors
//!
//! - [`CandidatePool`]: every voter, with weighted sampling without replacement
//! - [`CommitteeConsensus`]: one concurrent vote per member, quorum verdict
//! - [`ReviewLedger`]: decision/ground-truth history aligned by [`ReviewTicket`]
//! - [`ReputationUpdater`]: periodic reputation and weight recomputation

pub mod candidate;
pub mod config;
pub mod consensus;
pub mod error;
pub mod pool;
pub mod reputation;
pub mod review;

pub use candidate::{Candidate, CandidateId, CastVote, Honesty, JudgmentPolicy, Standing, VotePolicy};
pub use config::{CommitteeConfig, ReputationConfig};
pub use consensus::{CommitteeConsensus, ConsensusOutcome, MemberVote, VoteBreakdown};
pub use error::{CommitteeError, CommitteeResult};
pub use pool::{CandidatePool, Committee};
pub use reputation::{ReputationUpdater, RoundUpdate};
pub use review::{ReviewLedger, ReviewRecord, ReviewTicket};
