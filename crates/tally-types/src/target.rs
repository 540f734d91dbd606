use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::TargetId;

/// The kind of entity a vote is cast on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
}

impl TargetType {
    pub const ALL: [TargetType; 2] = [TargetType::Post, TargetType::Comment];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl FromStr for TargetType {
    type Err = TypeError;

    /// Accepts the singular and plural forms used in route paths.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" | "posts" => Ok(Self::Post),
            "comment" | "comments" => Ok(Self::Comment),
            _ => Err(TypeError::InvalidTargetType(s.to_string())),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified reference to a voteable entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    pub target_type: TargetType,
    pub target_id: TargetId,
}

impl TargetRef {
    pub fn new(target_type: TargetType, target_id: TargetId) -> Self {
        Self {
            target_type,
            target_id,
        }
    }

    pub fn post(id: TargetId) -> Self {
        Self::new(TargetType::Post, id)
    }

    pub fn comment(id: TargetId) -> Self {
        Self::new(TargetType::Comment, id)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.target_type, self.target_id)
    }
}
