//! Content fingerprints for compiled schema documents

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum of the raw bytes a schema was compiled from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that bytes match this checksum
    pub fn verify(&self, data: &[u8]) -> bool {
        *self == Self::from_bytes(data)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = br#"{"$id": "mem://doc1"}"#;
        assert_eq!(Checksum::from_bytes(content), Checksum::from_bytes(content));
    }

    #[test]
    fn test_checksum_different_content() {
        assert_ne!(
            Checksum::from_bytes(br#"{"type": "string"}"#),
            Checksum::from_bytes(br#"{"type": "number"}"#)
        );
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::from_bytes(b"abc");
        assert!(checksum.verify(b"abc"));
        assert!(!checksum.verify(b"abd"));
        assert_eq!(checksum.as_str().len(), 64);
    }
}
