//! In-memory vote and target store for tests, demos, and single-node use.
//!
//! [`InMemoryStore`] keeps targets, vote records, and a per-target index in
//! one `RwLock`. A commit holds the write lock for the revision check, the
//! record write, and the counter adjustment, so the three are observed
//! together or not at all. Each target also carries a version that every
//! counter change bumps, which repair uses as its compare-and-set token.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tally_types::{Tally, TallyDelta, TargetId, TargetRef, TargetType, UserId, VoteKey, VoteRecord};

use crate::error::{StoreError, StoreResult};
use crate::snapshot::{StoreSnapshot, TargetEntry};
use crate::traits::{TargetCensus, TargetStore, VoteStore};
use crate::transaction::{RecordWrite, VoteTransaction};

/// An in-memory implementation of [`TargetStore`] and [`VoteStore`].
///
/// Data is lost when the store is dropped unless a snapshot is saved.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreState>,
}

#[derive(Clone, Copy, Debug, Default)]
struct TargetRow {
    tally: Tally,
    version: u64,
}

impl TargetRow {
    fn set(&mut self, tally: Tally) {
        self.tally = tally;
        self.version += 1;
    }
}

#[derive(Debug, Default)]
struct StoreState {
    targets: HashMap<TargetRef, TargetRow>,
    votes: HashMap<VoteKey, VoteRecord>,
    voters: HashMap<TargetRef, BTreeSet<UserId>>,
}

impl StoreState {
    fn adjust(&mut self, target: &TargetRef, delta: TallyDelta) -> StoreResult<Tally> {
        let row = self
            .targets
            .get_mut(target)
            .ok_or_else(|| StoreError::TargetNotFound(target.clone()))?;
        row.set(row.tally.apply(delta));
        Ok(row.tally)
    }

    fn votes_on(&self, target: &TargetRef) -> Vec<VoteRecord> {
        let Some(users) = self.voters.get(target) else {
            return Vec::new();
        };
        users
            .iter()
            .filter_map(|user_id| {
                self.votes
                    .get(&VoteKey::new(user_id.clone(), target.clone()))
                    .cloned()
            })
            .collect()
    }

    fn put_vote(&mut self, record: VoteRecord) {
        self.voters
            .entry(record.target.clone())
            .or_default()
            .insert(record.user_id.clone());
        self.votes.insert(record.key(), record);
    }

    fn remove_vote(&mut self, key: &VoteKey) -> Option<VoteRecord> {
        let removed = self.votes.remove(key)?;
        if let Some(users) = self.voters.get_mut(&key.target) {
            users.remove(&key.user_id);
            if users.is_empty() {
                self.voters.remove(&key.target);
            }
        }
        Some(removed)
    }
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Register a target on behalf of the content store, with zeroed
    /// counters. Counters only move through commits from then on.
    pub fn register_target(&self, target: TargetRef) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.targets.contains_key(&target) {
            return Err(StoreError::TargetExists(target));
        }
        tracing::debug!(target_ref = %target, "registered target");
        state.targets.insert(target, TargetRow::default());
        Ok(())
    }

    /// Remove a target and every vote cast on it. Returns `true` if it existed.
    pub fn remove_target(&self, target: &TargetRef) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.targets.remove(target).is_none() {
            return Ok(false);
        }
        if let Some(users) = state.voters.remove(target) {
            for user_id in users {
                state.votes.remove(&VoteKey::new(user_id, target.clone()));
            }
        }
        Ok(true)
    }

    /// Number of active vote records across all targets.
    pub fn vote_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.votes.len())
    }

    /// Capture a consistent point-in-time copy of the whole store.
    pub fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let state = self.read()?;
        let mut targets: Vec<TargetEntry> = state
            .targets
            .iter()
            .map(|(target, row)| TargetEntry {
                target: target.clone(),
                tally: row.tally,
            })
            .collect();
        targets.sort_by(|a, b| a.target.cmp(&b.target));

        let mut votes: Vec<VoteRecord> = state.votes.values().cloned().collect();
        votes.sort_by_key(VoteRecord::key);

        Ok(StoreSnapshot::new(targets, votes))
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Counters are taken as stored, not recomputed; run an audit to detect
    /// drift. Target versions restart at zero. Duplicate targets or keys, and votes on unknown targets, are
    /// rejected as corrupt.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        let mut state = StoreState::default();
        for entry in snapshot.targets {
            let row = TargetRow {
                tally: entry.tally,
                version: 0,
            };
            if state.targets.insert(entry.target.clone(), row).is_some() {
                return Err(StoreError::CorruptSnapshot(format!(
                    "duplicate target {}",
                    entry.target
                )));
            }
        }
        for record in snapshot.votes {
            if !state.targets.contains_key(&record.target) {
                return Err(StoreError::CorruptSnapshot(format!(
                    "vote {} references unknown target",
                    record.key()
                )));
            }
            if state.votes.contains_key(&record.key()) {
                return Err(StoreError::CorruptSnapshot(format!(
                    "duplicate vote {}",
                    record.key()
                )));
            }
            state.put_vote(record);
        }
        Ok(Self {
            inner: RwLock::new(state),
        })
    }
}

impl TargetStore for InMemoryStore {
    fn tally(&self, target: &TargetRef) -> StoreResult<Option<Tally>> {
        Ok(self.read()?.targets.get(target).map(|row| row.tally))
    }

    fn adjust_counters(&self, target: &TargetRef, delta: TallyDelta) -> StoreResult<Tally> {
        self.write()?.adjust(target, delta)
    }

    fn compare_and_set_tally(
        &self,
        target: &TargetRef,
        expected_version: u64,
        replacement: Tally,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        let row = state
            .targets
            .get_mut(target)
            .ok_or_else(|| StoreError::TargetNotFound(target.clone()))?;
        if row.version != expected_version {
            return Ok(false);
        }
        row.set(replacement);
        Ok(true)
    }

    fn targets(&self, target_type: TargetType) -> StoreResult<Vec<TargetRef>> {
        let state = self.read()?;
        let mut out: Vec<TargetRef> = state
            .targets
            .keys()
            .filter(|t| t.target_type == target_type)
            .cloned()
            .collect();
        out.sort();
        Ok(out)
    }
}

impl VoteStore for InMemoryStore {
    fn read_vote(&self, key: &VoteKey) -> StoreResult<Option<VoteRecord>> {
        Ok(self.read()?.votes.get(key).cloned())
    }

    fn read_votes(
        &self,
        user_id: &UserId,
        target_type: TargetType,
        target_ids: &[TargetId],
    ) -> StoreResult<HashMap<TargetId, VoteRecord>> {
        let state = self.read()?;
        let mut out = HashMap::with_capacity(target_ids.len());
        for id in target_ids {
            let key = VoteKey::new(user_id.clone(), TargetRef::new(target_type, id.clone()));
            if let Some(record) = state.votes.get(&key) {
                out.insert(id.clone(), record.clone());
            }
        }
        Ok(out)
    }

    fn votes_for_target(&self, target: &TargetRef) -> StoreResult<Vec<VoteRecord>> {
        Ok(self.read()?.votes_on(target))
    }

    fn census(&self, target: &TargetRef) -> StoreResult<Option<TargetCensus>> {
        let state = self.read()?;
        Ok(state.targets.get(target).map(|row| TargetCensus {
            tally: row.tally,
            version: row.version,
            votes: state.votes_on(target),
        }))
    }

    fn commit(&self, txn: &VoteTransaction) -> StoreResult<Tally> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        if !state.targets.contains_key(&txn.key.target) {
            return Err(StoreError::TargetNotFound(txn.key.target.clone()));
        }

        let found = state.votes.get(&txn.key).map(|r| r.revision);
        if found != txn.expected_revision {
            return Err(StoreError::Conflict {
                key: txn.key.clone(),
                expected: txn.expected_revision,
                found,
            });
        }

        match &txn.write {
            RecordWrite::Insert(record) | RecordWrite::Update(record) => {
                state.put_vote(record.clone());
            }
            RecordWrite::Delete => {
                state.remove_vote(&txn.key);
            }
        }

        // Target presence was checked above under the same lock.
        state.adjust(&txn.key.target, txn.delta)
    }
}
