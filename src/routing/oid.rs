//! Git object identifiers.
//!
//! An [`Oid`] is exactly 40 hexadecimal characters. Lowercase is the canonical
//! form; uppercase input is accepted and normalized at construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a SHA-1 object id in hex characters.
pub const OID_LEN: usize = 40;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// Check whether the input is a SHA-1 commit id, in either case.
///
/// Used where an id is expected anyway (`?diff=`, explicit revisions); the
/// value is lowercased by [`Oid::new`].
pub fn is_oid(input: &str) -> bool {
    input.len() == OID_LEN && input.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check whether the input is a commit id in canonical lowercase form.
///
/// URL segments that may be either a commit or a path only count as a
/// commit in this form.
pub fn is_commit_id(input: &str) -> bool {
    input.len() == OID_LEN && input.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// A validated commit id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` unless the input is 40 hex characters.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into();
        if !is_oid(&oid) {
            return Err(TypeError::InvalidOid(oid));
        }
        Ok(Self(oid.to_ascii_lowercase()))
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in titles.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::str::FromStr for Oid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_oid() {
        assert!(is_oid("a64ae9c6d572e0ad906faa9a4a7a8d43f113278c"));
        assert!(is_oid("A64AE9C6D572E0AD906FAA9A4A7A8D43F113278C"));
        assert!(!is_oid("a64ae9c"));
        assert!(!is_oid("g64ae9c6d572e0ad906faa9a4a7a8d43f113278c"));
        assert!(!is_oid("a64ae9c6d572e0ad906faa9a4a7a8d43f113278c0"));
    }

    #[test]
    fn test_is_commit_id_is_lowercase_only() {
        assert!(is_commit_id("a64ae9c6d572e0ad906faa9a4a7a8d43f113278c"));
        assert!(!is_commit_id("A64AE9C6D572E0AD906FAA9A4A7A8D43F113278C"));
        assert!(!is_commit_id("a64ae9c"));
    }

    #[test]
    fn test_new_normalizes_case() {
        let oid = Oid::new("A64AE9C6D572E0AD906FAA9A4A7A8D43F113278C").unwrap();
        assert_eq!(oid.as_str(), "a64ae9c6d572e0ad906faa9a4a7a8d43f113278c");
        assert_eq!(oid.short(), "a64ae9c");
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(
            Oid::new("main"),
            Err(TypeError::InvalidOid("main".to_string()))
        );
    }

    #[test]
    fn test_serde_validates() {
        let parsed: Result<Oid, _> = serde_json::from_str("\"not-an-oid\"");
        assert!(parsed.is_err());

        let oid: Oid = serde_json::from_str("\"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\"").unwrap();
        assert_eq!(serde_json::to_string(&oid).unwrap(), "\"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\"");
    }
}
