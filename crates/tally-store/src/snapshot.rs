//! Point-in-time JSON snapshots of a store.
//!
//! Snapshots are written to a sibling temporary file and renamed into
//! place, so a crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_types::{Tally, TargetRef, VoteRecord};

use crate::error::StoreResult;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A target and its counters as stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub target: TargetRef,
    pub tally: Tally,
}

/// Serializable copy of every target and vote record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub targets: Vec<TargetEntry>,
    pub votes: Vec<VoteRecord>,
}

impl StoreSnapshot {
    pub fn new(targets: Vec<TargetEntry>, votes: Vec<VoteRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            targets,
            votes,
        }
    }

    /// Write the snapshot as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        tracing::info!(
            path = %path.display(),
            targets = self.targets.len(),
            votes = self.votes.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Read a snapshot written by [`StoreSnapshot::save`].
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = fs::read(path)?;
        let snapshot: Self = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(crate::error::StoreError::CorruptSnapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::InMemoryStore;
    use crate::traits::{TargetStore, VoteStore};
    use crate::transaction::VoteTransaction;
    use tally_types::{Direction, TallyDelta, TargetId, UserId, VoteKey};

    fn populated() -> (InMemoryStore, TargetRef) {
        let target = TargetRef::comment(TargetId::parse("c1").unwrap());
        let store = InMemoryStore::new();
        store.register_target(target.clone()).unwrap();
        store.adjust_counters(&target, TallyDelta::new(4, 0)).unwrap();
        let key = VoteKey::new(UserId::parse("bob").unwrap(), target.clone());
        let record = VoteRecord::new(key, Direction::Up, Utc::now());
        store
            .commit(&VoteTransaction::insert(record, TallyDelta::cast(Direction::Up)))
            .unwrap();
        (store, target)
    }

    #[test]
    fn save_and_load_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.json");
        let (store, target) = populated();

        store.snapshot().unwrap().save(&path).unwrap();
        let loaded = StoreSnapshot::load(&path).unwrap();
        let restored = InMemoryStore::from_snapshot(loaded).unwrap();

        assert_eq!(restored.tally(&target).unwrap(), Some(Tally::new(5, 0)));
        assert_eq!(restored.votes_for_target(&target).unwrap().len(), 1);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.json");
        let (store, target) = populated();

        StoreSnapshot::new(Vec::new(), Vec::new()).save(&path).unwrap();
        store.snapshot().unwrap().save(&path).unwrap();

        let loaded = StoreSnapshot::load(&path).unwrap();
        assert_eq!(loaded.targets.len(), 1);
        assert_eq!(loaded.targets[0].target, target);
        assert!(!dir.path().join("tally.json.tmp").exists());
    }

    #[test]
    fn load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.json");
        let mut snapshot = StoreSnapshot::new(Vec::new(), Vec::new());
        snapshot.version = 99;
        snapshot.save(&path).unwrap();

        let err = StoreSnapshot::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoreSnapshot::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
