use tally_store::StoreError;
use tally_types::{TargetRef, TypeError};

/// Errors surfaced by ledger operations.
///
/// Write conflicts never appear here directly: they are retried inside the
/// ledger and become [`LedgerError::Unavailable`] once the attempt budget
/// is spent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("caller identity required")]
    Unauthorized,

    #[error("target not found: {0}")]
    NotFound(TargetRef),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("vote ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<TypeError> for LedgerError {
    fn from(e: TypeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TargetNotFound(target) => Self::NotFound(target),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
