//! Storage seams for the Tally vote ledger.
//!
//! The ledger never touches storage directly. It talks to two traits:
//!
//! - [`TargetStore`]: the content store's side of the contract: does a
//!   target exist, what are its counters, and an atomic counter adjustment.
//! - [`VoteStore`]: vote records keyed uniquely by (user, target), plus
//!   [`VoteStore::commit`], which applies a record write and its counter
//!   delta as one atomic step guarded by an optimistic revision check.
//!
//! # Storage Backends
//!
//! - [`InMemoryStore`]: `HashMap`-based store implementing both traits,
//!   with JSON [`StoreSnapshot`]s for persistence across restarts.
//!
//! # Design Rules
//!
//! 1. At most one record exists per [`VoteKey`](tally_types::VoteKey).
//! 2. A commit whose expected revision does not match fails with
//!    [`StoreError::Conflict`] and changes nothing.
//! 3. Counters are only ever changed by a delta, never by read-compute-write
//!    in the caller. The one exception is repair, which uses
//!    compare-and-set on the target version from a [`TargetCensus`].
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;
pub mod transaction;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use snapshot::{StoreSnapshot, TargetEntry};
pub use traits::{TargetCensus, TargetStore, VoteStore};
pub use transaction::{RecordWrite, VoteTransaction};
