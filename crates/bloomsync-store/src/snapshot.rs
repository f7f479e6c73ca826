//! An immutable view of a document at one point in time.

use bytes::Bytes;

use bloomsync_core::{lines_from_bytes, ContentHash, CoreError};

/// The whole content of a document, read in one go.
///
/// Filter building, reconciliation and hashing within a round all work from
/// one snapshot so they observe the same content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Bytes,
    hash: ContentHash,
}

impl Snapshot {
    /// Wrap raw file bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let hash = ContentHash::hash(&bytes);
        Self { bytes, hash }
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The Blake3 hash of the raw bytes.
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// The content split into lines, terminators included.
    pub fn lines(&self) -> Result<Vec<&str>, CoreError> {
        lines_from_bytes(&self.bytes)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
