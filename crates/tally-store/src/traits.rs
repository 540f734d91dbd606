use std::collections::HashMap;

use tally_types::{Tally, TallyDelta, TargetId, TargetRef, TargetType, UserId, VoteKey, VoteRecord};

use crate::error::StoreResult;
use crate::transaction::VoteTransaction;

/// Counters and active votes of one target, read together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetCensus {
    pub tally: Tally,
    /// Bumped on every counter change; the token for
    /// [`TargetStore::compare_and_set_tally`].
    pub version: u64,
    /// Active votes, sorted by user id.
    pub votes: Vec<VoteRecord>,
}

/// The content store's side of the voting contract.
///
/// Posts and comments live elsewhere; this trait is the narrow seam through
/// which the ledger checks existence and adjusts their counters.
pub trait TargetStore: Send + Sync {
    /// Read the counters of a target. `Ok(None)` if it does not exist.
    fn tally(&self, target: &TargetRef) -> StoreResult<Option<Tally>>;

    /// Check whether a target exists.
    fn target_exists(&self, target: &TargetRef) -> StoreResult<bool> {
        Ok(self.tally(target)?.is_some())
    }

    /// Apply `delta` to the target's counters as a single atomic step and
    /// return the new counters.
    fn adjust_counters(&self, target: &TargetRef, delta: TallyDelta) -> StoreResult<Tally>;

    /// Replace the counters only if the target's version is still
    /// `expected_version`.
    ///
    /// Every counter change bumps the version, so `false` means something
    /// was written since the [`TargetCensus`] the caller is working from.
    /// Intended for recount/repair only; regular voting goes through deltas.
    fn compare_and_set_tally(
        &self,
        target: &TargetRef,
        expected_version: u64,
        replacement: Tally,
    ) -> StoreResult<bool>;

    /// List every known target of a type, sorted by id.
    fn targets(&self, target_type: TargetType) -> StoreResult<Vec<TargetRef>>;
}

/// Storage for vote records, keyed uniquely by (user, target).
pub trait VoteStore: Send + Sync {
    /// Read the active vote for a key. `Ok(None)` means no vote.
    fn read_vote(&self, key: &VoteKey) -> StoreResult<Option<VoteRecord>>;

    /// Read the caller's votes on many targets of one type.
    ///
    /// Targets without a vote are absent from the map. The default
    /// implementation calls `read_vote()` per id; backends should override
    /// it with a single round trip.
    fn read_votes(
        &self,
        user_id: &UserId,
        target_type: TargetType,
        target_ids: &[TargetId],
    ) -> StoreResult<HashMap<TargetId, VoteRecord>> {
        let mut out = HashMap::with_capacity(target_ids.len());
        for id in target_ids {
            let key = VoteKey::new(user_id.clone(), TargetRef::new(target_type, id.clone()));
            if let Some(record) = self.read_vote(&key)? {
                out.insert(id.clone(), record);
            }
        }
        Ok(out)
    }

    /// All active votes on a target, sorted by user id.
    fn votes_for_target(&self, target: &TargetRef) -> StoreResult<Vec<VoteRecord>>;

    /// Read a target's counters, version, and active votes as one
    /// consistent view. `Ok(None)` if the target does not exist.
    fn census(&self, target: &TargetRef) -> StoreResult<Option<TargetCensus>>;

    /// Atomically apply a record write and its counter delta.
    ///
    /// Fails with `StoreError::Conflict` if the key's current revision does
    /// not equal `txn.expected_revision`, and with
    /// `StoreError::TargetNotFound` if the target is gone. On any error
    /// neither the record nor the counters change.
    fn commit(&self, txn: &VoteTransaction) -> StoreResult<Tally>;
}
