//! Identity keys
//!
//! Every participant in the follow graph is a fixed 32-byte public key.
//! The canonical textual form is 64 lowercase hex characters.

use crate::errors::{AppError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of an identity key in bytes
pub const IDENTITY_LEN: usize = 32;

/// A 32-byte opaque public identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// Wrap raw key bytes
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the canonical 64-char lowercase hex form
    pub fn parse(input: &str) -> Result<Self> {
        if input.len() != IDENTITY_LEN * 2 {
            return Err(AppError::InvalidArgument {
                message: format!(
                    "identity must be {} hex characters, got {}",
                    IDENTITY_LEN * 2,
                    input.len()
                ),
            });
        }

        // hex::decode accepts uppercase, the canonical form does not
        if input.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(AppError::InvalidArgument {
                message: "identity must be lowercase hex".to_string(),
            });
        }

        let mut bytes = [0u8; IDENTITY_LEN];
        hex::decode_to_slice(input, &mut bytes).map_err(|e| AppError::InvalidArgument {
            message: format!("identity is not valid hex: {}", e),
        })?;

        Ok(Self(bytes))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Canonical lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Deterministic identity for tests and fixtures: `n` in the trailing bytes
    pub fn from_u64(n: u64) -> Self {
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes[IDENTITY_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", &self.to_hex()[..12])
    }
}

impl FromStr for Identity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Identity::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let hex = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
        let id = Identity::parse(hex).unwrap();
        assert_eq!(id.to_string(), hex);
    }

    #[test]
    fn test_rejects_bad_length() {
        let err = Identity::parse("abcd").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument { .. }));
    }

    #[test]
    fn test_rejects_uppercase() {
        let hex = "3BF0C63FCB93463407AF97A5E5EE64FA883D107EF9E558472C4EB9AAAEFA459D";
        assert!(Identity::parse(hex).is_err());
    }

    #[test]
    fn test_rejects_non_hex() {
        let hex = "zz".repeat(32);
        assert!(Identity::parse(&hex).is_err());
    }

    #[test]
    fn test_ordering_follows_bytes() {
        assert!(Identity::from_u64(1) < Identity::from_u64(2));
        assert!(Identity::from_u64(255) < Identity::from_u64(256));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = Identity::from_u64(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
