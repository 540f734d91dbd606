use thiserror::Error;

/// Errors produced while parsing or constructing foundation types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{kind} must not be empty")]
    EmptyIdentifier { kind: &'static str },

    #[error("invalid vote direction: {0:?}")]
    InvalidDirection(String),

    #[error("invalid target type: {0:?}")]
    InvalidTargetType(String),
}
