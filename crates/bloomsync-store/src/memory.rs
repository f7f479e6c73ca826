//! In-memory implementation of the Document trait.
//!
//! This is primarily for testing. It has the same whole-snapshot semantics
//! as the on-disk document but keeps the content in memory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use bloomsync_core::ContentHash;

use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::traits::Document;

/// In-memory document.
///
/// Thread-safe via RwLock. Counts replacements so tests can assert when
/// the protocol did or did not write.
pub struct MemoryDocument {
    name: String,
    content: RwLock<Snapshot>,
    writes: AtomicUsize,
}

impl MemoryDocument {
    /// Create a document holding `contents`.
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: RwLock::new(Snapshot::new(contents.into())),
            writes: AtomicUsize::new(0),
        }
    }

    /// Create an empty document.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Overwrite the content as a local user edit would.
    ///
    /// Not counted as a protocol write.
    pub fn edit(&self, contents: impl Into<Vec<u8>>) {
        let mut guard = self.content.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Snapshot::new(contents.into());
    }

    /// The current content, for assertions.
    pub fn contents(&self) -> Vec<u8> {
        self.snapshot().bytes().to_vec()
    }

    /// Number of times `replace` has been called.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Snapshot {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Document for MemoryDocument {
    async fn read(&self) -> Result<Snapshot> {
        Ok(self.snapshot())
    }

    async fn replace(&self, contents: &[u8]) -> Result<ContentHash> {
        let snapshot = Snapshot::new(contents.to_vec());
        let hash = snapshot.hash();
        *self.content.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DocumentExt;

    #[tokio::test]
    async fn test_memory_read_replace() {
        let doc = MemoryDocument::new("a", b"x\n".to_vec());
        assert_eq!(doc.read().await.unwrap().bytes().as_ref(), b"x\n");

        let hash = doc.replace(b"y\n").await.unwrap();
        assert_eq!(hash, ContentHash::hash(b"y\n"));
        assert_eq!(doc.contents(), b"y\n");
        assert_eq!(doc.write_count(), 1);
    }

    #[tokio::test]
    async fn test_edit_not_counted() {
        let doc = MemoryDocument::empty("a");
        doc.edit(b"local\n".to_vec());
        assert_eq!(doc.write_count(), 0);
        assert_eq!(
            doc.content_hash().await.unwrap(),
            ContentHash::hash(b"local\n")
        );
    }
}
