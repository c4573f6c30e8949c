//! Sender identifiers.
//!
//! A sender identifier names the paying party, usually a DID such as
//! `did:paysign:wallet.example:3f2a...`. The protocol treats it as an opaque
//! string: it is never split, indexed or otherwise parsed to find a user ID
//! inside it. The whole string is the key into the identity registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::MAX_SENDER_LENGTH;

/// Why a sender identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SenderIdError {
    #[error("sender identifier cannot be empty")]
    Empty,

    #[error("sender identifier is {len} bytes, maximum is {max}")]
    TooLong { len: usize, max: usize },
}

/// A non-empty, trimmed sender identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SenderId(String);

impl SenderId {
    /// Validates and wraps an identifier. Surrounding whitespace is dropped.
    pub fn new(raw: &str) -> Result<Self, SenderIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SenderIdError::Empty);
        }
        if trimmed.len() > MAX_SENDER_LENGTH {
            return Err(SenderIdError::TooLong {
                len: trimmed.len(),
                max: MAX_SENDER_LENGTH,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key bytes used by the sled trees.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SenderId {
    type Error = SenderIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<SenderId> for String {
    fn from(value: SenderId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_keeps_whole_identifier() {
        let id = SenderId::new("  did:paysign:wallet.example:42  ").unwrap();
        assert_eq!(id.as_str(), "did:paysign:wallet.example:42");
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(SenderId::new(""), Err(SenderIdError::Empty));
        assert_eq!(SenderId::new(" \t "), Err(SenderIdError::Empty));
    }

    #[test]
    fn test_too_long_rejected() {
        let long = "x".repeat(MAX_SENDER_LENGTH + 1);
        match SenderId::new(&long) {
            Err(SenderIdError::TooLong { len, .. }) => assert_eq!(len, MAX_SENDER_LENGTH + 1),
            other => panic!("expected TooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<SenderId>("\"\"").is_err());
        let id: SenderId = serde_json::from_str("\"did:x:1\"").unwrap();
        assert_eq!(id.to_string(), "did:x:1");
    }
}
