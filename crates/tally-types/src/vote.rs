use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::UserId;
use crate::target::TargetRef;

/// The two possible vote states. Absence of a vote is modeled as
/// `Option<Direction>::None`, never as a third variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl FromStr for Direction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "1" | "+1" => Ok(Self::Up),
            "down" | "-1" => Ok(Self::Down),
            _ => Err(TypeError::InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique key of a vote record. At most one record exists per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteKey {
    pub user_id: UserId,
    pub target: TargetRef,
}

impl VoteKey {
    pub fn new(user_id: UserId, target: TargetRef) -> Self {
        Self { user_id, target }
    }
}

impl fmt::Display for VoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user_id, self.target)
    }
}

/// A user's active vote on a target.
///
/// Created on first vote, flipped in place on a switch, deleted on
/// retraction. `revision` starts at 1 and increases on every in-place
/// update; stores use it as the optimistic-concurrency token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub user_id: UserId,
    pub target: TargetRef,
    pub direction: Direction,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VoteRecord {
    /// A fresh record at revision 1.
    pub fn new(key: VoteKey, direction: Direction, at: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id,
            target: key.target,
            direction,
            revision: 1,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn key(&self) -> VoteKey {
        VoteKey::new(self.user_id.clone(), self.target.clone())
    }

    /// The same record with its direction flipped and revision bumped.
    pub fn switched(&self, direction: Direction, at: DateTime<Utc>) -> Self {
        Self {
            direction,
            revision: self.revision + 1,
            updated_at: at,
            ..self.clone()
        }
    }
}
