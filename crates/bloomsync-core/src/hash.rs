//! Hashing primitives: whole-file content hashes and per-occurrence
//! line fingerprints.
//!
//! Both are Blake3. Line fingerprints are domain-separated from content
//! hashes so a one-line file never collides with its own fingerprint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain prefix for line fingerprints.
const LINE_DOMAIN: &[u8] = b"bloomsync-line-v0:";

/// A 32-byte Blake3 hash over a whole file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Length of the hash on the wire.
    pub const LEN: usize = 32;

    /// Compute the hash of the given file bytes.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The hash of an empty file.
    pub fn empty() -> Self {
        Self::hash(&[])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// The per-occurrence fingerprint `h0 = hash(value, occurrence)`.
///
/// Two 64-bit words drive the probe sequence of a Bloom filter:
/// `probe(i) = h1 + i * h2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    h1: u64,
    h2: u64,
}

impl Fingerprint {
    /// Fingerprint the `occurrence`-th copy (1-based) of `line`.
    pub fn of(line: &str, occurrence: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(LINE_DOMAIN);
        hasher.update(&occurrence.to_le_bytes());
        hasher.update(line.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();

        let mut h1 = [0u8; 8];
        let mut h2 = [0u8; 8];
        h1.copy_from_slice(&bytes[0..8]);
        h2.copy_from_slice(&bytes[8..16]);

        Self {
            h1: u64::from_le_bytes(h1),
            h2: u64::from_le_bytes(h2),
        }
    }

    /// The `round`-th probe value, before reduction modulo the filter size.
    pub fn probe(&self, round: u32) -> u64 {
        self.h1.wrapping_add((round as u64).wrapping_mul(self.h2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let h1 = ContentHash::hash(b"x\ny\nz\n");
        let h2 = ContentHash::hash(b"x\ny\nz\n");
        assert_eq!(h1, h2);
        assert_ne!(h1, ContentHash::hash(b"x\ny\nw\n"));
    }

    #[test]
    fn test_content_hash_hex_roundtrip() {
        let h = ContentHash::hash(b"hello");
        let recovered = ContentHash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, recovered);
    }

    #[test]
    fn test_fingerprint_depends_on_occurrence() {
        let a1 = Fingerprint::of("a\n", 1);
        let a2 = Fingerprint::of("a\n", 2);
        assert_ne!(a1, a2);
        assert_eq!(a1, Fingerprint::of("a\n", 1));
    }

    #[test]
    fn test_fingerprint_not_content_hash() {
        let fp = Fingerprint::of("a\n", 1);
        let content = ContentHash::hash(b"a\n");
        let mut h1 = [0u8; 8];
        h1.copy_from_slice(&content.0[0..8]);
        assert_ne!(fp.probe(0), u64::from_le_bytes(h1));
    }
}
