use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque identity of a voting user.
///
/// Issued by the authentication layer; the ledger only requires that it is
/// non-empty. Leading and trailing whitespace is stripped on parse.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, TypeError> {
        non_empty(raw.as_ref(), "user id").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of a post or comment, owned by the content store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetId(String);

impl TargetId {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, TypeError> {
        non_empty(raw.as_ref(), "target id").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn non_empty(raw: &str, kind: &'static str) -> Result<String, TypeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TypeError::EmptyIdentifier { kind });
    }
    Ok(trimmed.to_string())
}

macro_rules! string_newtype_impls {
    ($ty:ident, $label:literal) => {
        impl TryFrom<String> for $ty {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_newtype_impls!(UserId, "UserId");
string_newtype_impls!(TargetId, "TargetId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let id = UserId::parse("  alice ").unwrap();
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert_eq!(
            UserId::parse("   ").unwrap_err(),
            TypeError::EmptyIdentifier { kind: "user id" }
        );
        assert_eq!(
            TargetId::parse("").unwrap_err(),
            TypeError::EmptyIdentifier { kind: "target id" }
        );
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: TargetId = serde_json::from_str("\"post42\"").unwrap();
        assert_eq!(ok.as_str(), "post42");
        assert!(serde_json::from_str::<TargetId>("\"\"").is_err());
    }

    #[test]
    fn display_and_debug() {
        let id = TargetId::parse("c-7").unwrap();
        assert_eq!(id.to_string(), "c-7");
        assert_eq!(format!("{id:?}"), "TargetId(c-7)");
    }
}
