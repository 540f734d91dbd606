//! Foundation types for the Tally vote ledger.
//!
//! Every other Tally crate depends on `tally-types`. The types here carry no
//! storage or concurrency behavior; they describe who voted, on what, in
//! which direction, and what the resulting counters look like.
//!
//! # Key Types
//!
//! - [`UserId`] / [`TargetId`]: validated, non-empty opaque identifiers
//! - [`TargetType`] / [`TargetRef`]: what kind of entity is being voted on
//! - [`Direction`]: up or down
//! - [`VoteKey`] / [`VoteRecord`]: the single active vote per (user, target)
//! - [`Tally`] / [`TallyDelta`]: denormalized counters and their adjustments
//! - [`VoteOutcome`]: the result returned to callers after a vote

pub mod error;
pub mod identity;
pub mod outcome;
pub mod tally;
pub mod target;
pub mod vote;

pub use error::TypeError;
pub use identity::{TargetId, UserId};
pub use outcome::VoteOutcome;
pub use tally::{Tally, TallyDelta};
pub use target::{TargetRef, TargetType};
pub use vote::{Direction, VoteKey, VoteRecord};
