use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tally_store::{TargetStore, VoteStore};
use tally_types::{
    Direction, Tally, TargetId, TargetRef, TargetType, UserId, VoteKey, VoteOutcome,
};

use crate::audit::{AuditReport, TallyAuditor};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::traits::{VoteCaster, VoteReader};
use crate::transition::plan;

/// The vote ledger over any store implementing both storage seams.
///
/// Each cast reads the caller's record, plans the transition, and commits
/// the record write and counter delta as one store transaction. A commit
/// that loses a race on the same (user, target) key is re-planned from a
/// fresh read, up to [`LedgerConfig::max_attempts`] times.
pub struct VoteLedger<S> {
    store: Arc<S>,
    config: LedgerConfig,
}

impl<S> VoteLedger<S>
where
    S: VoteStore + TargetStore,
{
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Recount a target's active votes without changing anything.
    pub fn audit(&self, target: &TargetRef) -> LedgerResult<AuditReport> {
        TallyAuditor::audit(self.store.as_ref(), target)
    }

    /// Recount a target and overwrite drifted counters.
    pub fn repair(&self, target: &TargetRef) -> LedgerResult<AuditReport> {
        TallyAuditor::repair(self.store.as_ref(), target, self.config.attempts())
    }

    fn ensure_target(&self, target: &TargetRef) -> LedgerResult<()> {
        if self.store.target_exists(target)? {
            Ok(())
        } else {
            Err(LedgerError::NotFound(target.clone()))
        }
    }

    fn commit_with_retry(&self, key: VoteKey, direction: Direction) -> LedgerResult<VoteOutcome> {
        let attempts = self.config.attempts();
        for attempt in 1..=attempts {
            let existing = self.store.read_vote(&key)?;
            let transition = plan(existing.as_ref(), key.clone(), direction, Utc::now());

            match self.store.commit(&transition.txn) {
                Ok(tally) => {
                    tracing::debug!(
                        vote = %key,
                        kind = ?transition.kind,
                        attempt,
                        upvotes = tally.upvotes,
                        downvotes = tally.downvotes,
                        "vote committed"
                    );
                    let tally = self.check_counters(&key.target, tally);
                    return Ok(VoteOutcome::new(tally, transition.user_vote));
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(vote = %key, attempt, "write conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(vote = %key, attempts, "vote retry budget exhausted");
        Err(LedgerError::Unavailable(format!(
            "vote on {} did not commit after {attempts} attempts",
            key.target
        )))
    }

    /// A negative counter means some writer bypassed the ledger. Repair
    /// the target and report the recounted value, keeping the committed
    /// value if repair itself fails.
    fn check_counters(&self, target: &TargetRef, tally: Tally) -> Tally {
        if tally.is_consistent() || !self.config.repair_on_negative {
            return tally;
        }
        tracing::warn!(
            target_ref = %target,
            upvotes = tally.upvotes,
            downvotes = tally.downvotes,
            "negative vote counter, recounting"
        );
        match self.repair(target) {
            Ok(report) => match self.store.tally(target) {
                Ok(Some(current)) => current,
                _ => report.recounted,
            },
            Err(e) => {
                tracing::error!(target_ref = %target, error = %e, "counter repair failed");
                tally
            }
        }
    }
}

impl<S> VoteCaster for VoteLedger<S>
where
    S: VoteStore + TargetStore,
{
    fn cast_vote(
        &self,
        user_id: Option<&UserId>,
        target: &TargetRef,
        direction: &str,
    ) -> LedgerResult<VoteOutcome> {
        let user_id = user_id.ok_or(LedgerError::Unauthorized)?;
        let direction: Direction = direction.parse()?;
        self.cast(user_id, target, direction)
    }

    fn cast(
        &self,
        user_id: &UserId,
        target: &TargetRef,
        direction: Direction,
    ) -> LedgerResult<VoteOutcome> {
        self.ensure_target(target)?;
        self.commit_with_retry(VoteKey::new(user_id.clone(), target.clone()), direction)
    }
}

impl<S> VoteReader for VoteLedger<S>
where
    S: VoteStore + TargetStore,
{
    fn user_vote(&self, user_id: &UserId, target: &TargetRef) -> LedgerResult<Option<Direction>> {
        let key = VoteKey::new(user_id.clone(), target.clone());
        Ok(self.store.read_vote(&key)?.map(|r| r.direction))
    }

    fn user_votes(
        &self,
        user_id: &UserId,
        target_type: TargetType,
        target_ids: &[TargetId],
    ) -> LedgerResult<BTreeMap<TargetId, Option<Direction>>> {
        let mut unique = target_ids.to_vec();
        unique.sort();
        unique.dedup();

        let mut found = self.store.read_votes(user_id, target_type, &unique)?;
        Ok(unique
            .into_iter()
            .map(|id| {
                let vote = found.remove(&id).map(|r| r.direction);
                (id, vote)
            })
            .collect())
    }

    fn tally(&self, target: &TargetRef) -> LedgerResult<Tally> {
        self.store
            .tally(target)?
            .ok_or_else(|| LedgerError::NotFound(target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    use proptest::prelude::*;
    use tally_store::{InMemoryStore, StoreError, StoreResult, TargetCensus, VoteTransaction};
    use tally_types::{TallyDelta, VoteRecord};

    fn user(name: &str) -> UserId {
        UserId::parse(name).unwrap()
    }

    fn post(id: &str) -> TargetRef {
        TargetRef::post(TargetId::parse(id).unwrap())
    }

    fn ledger_with(targets: &[TargetRef]) -> VoteLedger<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for t in targets {
            store.register_target(t.clone()).unwrap();
        }
        VoteLedger::new(store, LedgerConfig::default())
    }

    /// Seed `up` upvotes and `down` downvotes from distinct background users.
    fn seed(ledger: &VoteLedger<InMemoryStore>, target: &TargetRef, up: usize, down: usize) {
        for i in 0..up {
            ledger.cast(&user(&format!("seed-up-{i}")), target, Direction::Up).unwrap();
        }
        for i in 0..down {
            ledger.cast(&user(&format!("seed-down-{i}")), target, Direction::Down).unwrap();
        }
    }

    #[test]
    fn alice_scenario() {
        let t = post("post42");
        let ledger = ledger_with(&[t.clone()]);
        seed(&ledger, &t, 10, 2);
        let alice = user("alice");

        let first = ledger.cast_vote(Some(&alice), &t, "up").unwrap();
        assert_eq!(
            first,
            VoteOutcome {
                vote_count: 9,
                upvotes: 11,
                downvotes: 2,
                user_vote: Some(Direction::Up),
            }
        );

        let retract = ledger.cast_vote(Some(&alice), &t, "up").unwrap();
        assert_eq!(
            retract,
            VoteOutcome {
                vote_count: 8,
                upvotes: 10,
                downvotes: 2,
                user_vote: None,
            }
        );

        let down = ledger.cast_vote(Some(&alice), &t, "down").unwrap();
        assert_eq!(
            down,
            VoteOutcome {
                vote_count: 7,
                upvotes: 10,
                downvotes: 3,
                user_vote: Some(Direction::Down),
            }
        );
        assert_eq!(ledger.user_vote(&alice, &t).unwrap(), Some(Direction::Down));
    }

    #[test]
    fn switch_moves_exactly_one_vote() {
        let t = post("p");
        let ledger = ledger_with(&[t.clone()]);
        seed(&ledger, &t, 3, 3);
        let bob = user("bob");

        ledger.cast(&bob, &t, Direction::Up).unwrap();
        let out = ledger.cast(&bob, &t, Direction::Down).unwrap();

        assert_eq!(out.upvotes, 3);
        assert_eq!(out.downvotes, 4);
        assert_eq!(out.user_vote, Some(Direction::Down));
        assert!(ledger.audit(&t).unwrap().is_consistent());
    }

    #[test]
    fn anonymous_caller_is_unauthorized_without_side_effects() {
        let t = post("post42");
        let ledger = ledger_with(&[t.clone()]);
        seed(&ledger, &t, 1, 0);

        let err = ledger.cast_vote(None, &t, "up").unwrap_err();

        assert_eq!(err, LedgerError::Unauthorized);
        assert_eq!(ledger.tally(&t).unwrap(), Tally::new(1, 0));
    }

    #[test]
    fn missing_target_is_not_found_without_side_effects() {
        let ledger = ledger_with(&[]);
        let ghost = post("doesNotExist");

        let err = ledger.cast_vote(Some(&user("alice")), &ghost, "up").unwrap_err();

        assert_eq!(err, LedgerError::NotFound(ghost));
        assert_eq!(ledger.store().vote_count().unwrap(), 0);
    }

    #[test]
    fn bad_direction_is_invalid_argument() {
        let t = post("p");
        let ledger = ledger_with(&[t.clone()]);
        let err = ledger.cast_vote(Some(&user("alice")), &t, "sideways").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
        assert_eq!(ledger.tally(&t).unwrap(), Tally::default());
    }

    #[test]
    fn unauthorized_is_checked_before_direction_and_target() {
        let ledger = ledger_with(&[]);
        let err = ledger.cast_vote(None, &post("ghost"), "sideways").unwrap_err();
        assert_eq!(err, LedgerError::Unauthorized);
    }

    #[test]
    fn batch_lookup_covers_every_requested_id() {
        let a = post("a");
        let b = post("b");
        let ledger = ledger_with(&[a.clone(), b.clone()]);
        let alice = user("alice");
        ledger.cast(&alice, &b, Direction::Down).unwrap();

        let ids = vec![
            b.target_id.clone(),
            a.target_id.clone(),
            b.target_id.clone(),
            TargetId::parse("unknown").unwrap(),
        ];
        let votes = ledger.user_votes(&alice, TargetType::Post, &ids).unwrap();

        assert_eq!(votes.len(), 3);
        assert_eq!(votes[&a.target_id], None);
        assert_eq!(votes[&b.target_id], Some(Direction::Down));
        assert_eq!(votes[&TargetId::parse("unknown").unwrap()], None);
    }

    #[test]
    fn batch_lookup_of_nothing_is_empty() {
        let ledger = ledger_with(&[]);
        let votes = ledger.user_votes(&user("alice"), TargetType::Comment, &[]).unwrap();
        assert!(votes.is_empty());
    }

    #[test]
    fn votes_are_scoped_by_target_type() {
        let id = TargetId::parse("42").unwrap();
        let as_post = TargetRef::post(id.clone());
        let as_comment = TargetRef::comment(id);
        let ledger = ledger_with(&[as_post.clone(), as_comment.clone()]);
        let alice = user("alice");

        ledger.cast(&alice, &as_post, Direction::Up).unwrap();

        assert_eq!(ledger.user_vote(&alice, &as_post).unwrap(), Some(Direction::Up));
        assert_eq!(ledger.user_vote(&alice, &as_comment).unwrap(), None);
        assert_eq!(ledger.tally(&as_comment).unwrap(), Tally::default());
    }

    #[test]
    fn concurrent_disjoint_voters_lose_no_updates() {
        let t = post("hot");
        let ledger = ledger_with(&[t.clone()]);
        seed(&ledger, &t, 5, 1);

        thread::scope(|s| {
            for i in 0..64 {
                let ledger = &ledger;
                let t = &t;
                s.spawn(move || {
                    ledger.cast(&user(&format!("voter-{i}")), t, Direction::Up).unwrap();
                });
            }
        });

        assert_eq!(ledger.tally(&t).unwrap(), Tally::new(69, 1));
        assert!(ledger.audit(&t).unwrap().is_consistent());
    }

    #[test]
    fn same_user_racing_keeps_one_record() {
        let t = post("p");
        let store = Arc::new(InMemoryStore::new());
        store.register_target(t.clone()).unwrap();
        // A generous budget so every click eventually commits.
        let ledger = VoteLedger::new(
            store,
            LedgerConfig {
                max_attempts: 1_000,
                ..Default::default()
            },
        );
        let alice = user("alice");

        thread::scope(|s| {
            for n in 0..8 {
                let (ledger, t, alice) = (&ledger, &t, &alice);
                s.spawn(move || {
                    let d = if n % 2 == 0 { Direction::Up } else { Direction::Down };
                    for _ in 0..50 {
                        ledger.cast(alice, t, d).unwrap();
                    }
                });
            }
        });

        let records = ledger.store().votes_for_target(&t).unwrap();
        assert!(records.len() <= 1);
        let report = ledger.audit(&t).unwrap();
        assert!(report.is_consistent(), "{report:?}");
        assert_eq!(report.active_votes, records.len());
    }

    /// Fails the first `conflicts` commits with a write conflict.
    struct ContendedStore {
        inner: InMemoryStore,
        conflicts: AtomicU32,
    }

    impl ContendedStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: InMemoryStore::new(),
                conflicts: AtomicU32::new(conflicts),
            }
        }
    }

    impl TargetStore for ContendedStore {
        fn tally(&self, target: &TargetRef) -> StoreResult<Option<Tally>> {
            self.inner.tally(target)
        }

        fn adjust_counters(&self, target: &TargetRef, delta: TallyDelta) -> StoreResult<Tally> {
            self.inner.adjust_counters(target, delta)
        }

        fn compare_and_set_tally(
            &self,
            target: &TargetRef,
            expected_version: u64,
            replacement: Tally,
        ) -> StoreResult<bool> {
            self.inner.compare_and_set_tally(target, expected_version, replacement)
        }

        fn targets(&self, target_type: TargetType) -> StoreResult<Vec<TargetRef>> {
            self.inner.targets(target_type)
        }
    }

    impl VoteStore for ContendedStore {
        fn read_vote(&self, key: &VoteKey) -> StoreResult<Option<VoteRecord>> {
            self.inner.read_vote(key)
        }

        fn votes_for_target(&self, target: &TargetRef) -> StoreResult<Vec<VoteRecord>> {
            self.inner.votes_for_target(target)
        }

        fn census(&self, target: &TargetRef) -> StoreResult<Option<TargetCensus>> {
            self.inner.census(target)
        }

        fn commit(&self, txn: &VoteTransaction) -> StoreResult<Tally> {
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Conflict {
                    key: txn.key.clone(),
                    expected: txn.expected_revision,
                    found: Some(99),
                });
            }
            self.inner.commit(txn)
        }
    }

    fn contended(conflicts: u32, target: &TargetRef) -> VoteLedger<ContendedStore> {
        let store = ContendedStore::new(conflicts);
        store.inner.register_target(target.clone()).unwrap();
        VoteLedger::new(Arc::new(store), LedgerConfig::default())
    }

    #[test]
    fn conflicts_within_budget_are_invisible() {
        let t = post("p");
        let ledger = contended(2, &t);
        let out = ledger.cast(&user("alice"), &t, Direction::Up).unwrap();
        assert_eq!(out.upvotes, 1);
        assert_eq!(out.user_vote, Some(Direction::Up));
    }

    #[test]
    fn exhausted_budget_is_unavailable_without_side_effects() {
        let t = post("p");
        let ledger = contended(3, &t);

        let err = ledger.cast(&user("alice"), &t, Direction::Up).unwrap_err();

        assert!(matches!(err, LedgerError::Unavailable(_)));
        assert_eq!(ledger.tally(&t).unwrap(), Tally::default());
        assert_eq!(ledger.user_vote(&user("alice"), &t).unwrap(), None);
    }

    #[test]
    fn default_batch_read_on_custom_store() {
        let t = post("p");
        let ledger = contended(0, &t);
        ledger.cast(&user("alice"), &t, Direction::Down).unwrap();
        let votes = ledger
            .user_votes(&user("alice"), TargetType::Post, &[t.target_id.clone()])
            .unwrap();
        assert_eq!(votes[&t.target_id], Some(Direction::Down));
    }

    #[test]
    fn negative_counter_triggers_repair() {
        let t = post("p");
        let ledger = ledger_with(&[t.clone()]);
        let alice = user("alice");
        ledger.cast(&alice, &t, Direction::Up).unwrap();
        // A writer outside the ledger knocks the counter below zero.
        ledger.store().adjust_counters(&t, TallyDelta::new(-3, 0)).unwrap();

        let out = ledger.cast(&alice, &t, Direction::Up).unwrap();

        assert_eq!(out.user_vote, None);
        assert_eq!(out.tally(), Tally::default());
        assert_eq!(ledger.tally(&t).unwrap(), Tally::default());
    }

    #[test]
    fn negative_counter_left_alone_when_repair_disabled() {
        let t = post("p");
        let store = Arc::new(InMemoryStore::new());
        store.register_target(t.clone()).unwrap();
        let ledger = VoteLedger::new(
            store,
            LedgerConfig {
                repair_on_negative: false,
                ..Default::default()
            },
        );
        ledger.store().adjust_counters(&t, TallyDelta::new(0, -2)).unwrap();

        let out = ledger.cast(&user("alice"), &t, Direction::Down).unwrap();
        assert_eq!(out.downvotes, -1);
    }

    #[derive(Clone, Debug)]
    struct Op {
        user: usize,
        target: usize,
        direction: Direction,
    }

    fn op() -> impl Strategy<Value = Op> {
        (0usize..4, 0usize..2, prop_oneof![Just(Direction::Up), Just(Direction::Down)])
            .prop_map(|(user, target, direction)| Op {
                user,
                target,
                direction,
            })
    }

    proptest! {
        #[test]
        fn any_vote_sequence_keeps_invariants(ops in proptest::collection::vec(op(), 1..60)) {
            let targets = [post("t0"), post("t1")];
            let users: Vec<UserId> = (0..4).map(|i| user(&format!("u{i}"))).collect();
            let ledger = ledger_with(&targets);
            let mut model: BTreeMap<(usize, usize), Direction> = BTreeMap::new();

            for op in ops {
                let target = &targets[op.target];
                let out = ledger.cast(&users[op.user], target, op.direction).unwrap();

                let slot = (op.user, op.target);
                let expected = match model.get(&slot) {
                    Some(d) if *d == op.direction => None,
                    _ => Some(op.direction),
                };
                match expected {
                    Some(d) => { model.insert(slot, d); }
                    None => { model.remove(&slot); }
                }
                prop_assert_eq!(out.user_vote, expected);

                let mut want = Tally::default();
                for ((_, t), d) in &model {
                    if *t == op.target {
                        want.record(*d);
                    }
                }
                prop_assert_eq!(out.tally(), want);
                prop_assert_eq!(out.vote_count, want.vote_count());

                let records = ledger.store().votes_for_target(target).unwrap();
                let mut seen = std::collections::HashSet::new();
                for r in &records {
                    prop_assert!(seen.insert(r.user_id.clone()), "duplicate record for {}", r.user_id);
                }
                prop_assert!(ledger.audit(target).unwrap().is_consistent());
            }
        }
    }
}
