use tally_types::{TargetRef, VoteKey};

/// Errors from vote and target store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The stored record revision did not match the transaction's
    /// expectation. Transient: the caller re-reads and retries.
    #[error("write conflict on {key}: expected revision {expected:?}, found {found:?}")]
    Conflict {
        key: VoteKey,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// The target does not exist in the content store.
    #[error("target not found: {0}")]
    TargetNotFound(TargetRef),

    /// A target with this reference is already registered.
    #[error("target already exists: {0}")]
    TargetExists(TargetRef),

    /// Snapshot contents violate a store invariant.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests (e.g. a poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether retrying the same logical operation may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
