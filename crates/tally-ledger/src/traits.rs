use std::collections::BTreeMap;

use tally_types::{Direction, Tally, TargetId, TargetRef, TargetType, UserId, VoteOutcome};

use crate::error::LedgerResult;

/// Write boundary: casting, switching, and retracting votes.
pub trait VoteCaster: Send + Sync {
    /// Apply a vote request exactly as it arrived from a caller.
    ///
    /// `user_id` is `None` for anonymous callers. `direction` is the raw
    /// requested direction and is validated here.
    fn cast_vote(
        &self,
        user_id: Option<&UserId>,
        target: &TargetRef,
        direction: &str,
    ) -> LedgerResult<VoteOutcome>;

    /// Typed variant for callers holding already-validated values.
    fn cast(
        &self,
        user_id: &UserId,
        target: &TargetRef,
        direction: Direction,
    ) -> LedgerResult<VoteOutcome>;
}

/// Read boundary: per-user vote state and counters.
pub trait VoteReader: Send + Sync {
    /// The caller's current vote on a target, `None` when neutral.
    fn user_vote(&self, user_id: &UserId, target: &TargetRef) -> LedgerResult<Option<Direction>>;

    /// The caller's votes on many targets of one type in one lookup.
    ///
    /// Every requested id appears in the result; neutral ones map to `None`.
    fn user_votes(
        &self,
        user_id: &UserId,
        target_type: TargetType,
        target_ids: &[TargetId],
    ) -> LedgerResult<BTreeMap<TargetId, Option<Direction>>>;

    /// Current counters of a target.
    fn tally(&self, target: &TargetRef) -> LedgerResult<Tally>;
}
