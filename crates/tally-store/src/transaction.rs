use tally_types::{TallyDelta, VoteKey, VoteRecord};

/// The record half of a [`VoteTransaction`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordWrite {
    /// Create the record. Only valid when no record exists for the key.
    Insert(VoteRecord),
    /// Replace the record in place.
    Update(VoteRecord),
    /// Remove the record.
    Delete,
}

/// A record write and its counter adjustment, committed atomically.
///
/// `expected_revision` is the revision the writer observed when it planned
/// the change: `None` means "no record existed". The store rejects the
/// transaction with a conflict if the key's current revision differs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteTransaction {
    pub key: VoteKey,
    pub expected_revision: Option<u64>,
    pub write: RecordWrite,
    pub delta: TallyDelta,
}

impl VoteTransaction {
    pub fn insert(record: VoteRecord, delta: TallyDelta) -> Self {
        Self {
            key: record.key(),
            expected_revision: None,
            write: RecordWrite::Insert(record),
            delta,
        }
    }

    pub fn update(record: VoteRecord, expected_revision: u64, delta: TallyDelta) -> Self {
        Self {
            key: record.key(),
            expected_revision: Some(expected_revision),
            write: RecordWrite::Update(record),
            delta,
        }
    }

    pub fn delete(key: VoteKey, expected_revision: u64, delta: TallyDelta) -> Self {
        Self {
            key,
            expected_revision: Some(expected_revision),
            write: RecordWrite::Delete,
            delta,
        }
    }

    /// The record left behind by this transaction, if any.
    pub fn resulting_record(&self) -> Option<&VoteRecord> {
        match &self.write {
            RecordWrite::Insert(r) | RecordWrite::Update(r) => Some(r),
            RecordWrite::Delete => None,
        }
    }
}
