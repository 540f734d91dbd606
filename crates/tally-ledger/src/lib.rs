//! The Tally vote ledger.
//!
//! This crate owns the rule that each user holds at most one directional
//! vote per target and that a target's counters always equal the sum of its
//! active votes. It provides:
//! - [`plan`], the pure three-way transition (cast, retract, switch)
//! - [`VoteLedger`], which commits planned transitions with bounded
//!   optimistic retry
//! - [`VoteCaster`] / [`VoteReader`] trait boundaries
//! - [`TallyAuditor`], which recounts active votes and repairs drift

pub mod audit;
pub mod config;
pub mod error;
pub mod ledger;
pub mod traits;
pub mod transition;

pub use audit::{AuditReport, Discrepancy, DiscrepancyKind, TallyAuditor};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::VoteLedger;
pub use traits::{VoteCaster, VoteReader};
pub use transition::{plan, Transition, TransitionKind};
