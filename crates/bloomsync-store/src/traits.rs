//! Document trait: the abstract interface to the synchronized file.
//!
//! The sync protocol reads the file as whole snapshots and writes it as
//! whole replacements. Implementations include an on-disk file and an
//! in-memory buffer for tests.

use async_trait::async_trait;

use bloomsync_core::ContentHash;

use crate::error::Result;
use crate::snapshot::Snapshot;

/// Async interface to the one file being synchronized.
///
/// # Design Notes
///
/// - **Consistent reads**: `read` returns the content as of a single point
///   in time; a concurrent `replace` is either fully visible or not at all.
/// - **Whole-file writes**: `replace` never leaves a partially written file.
#[async_trait]
pub trait Document: Send + Sync {
    /// Read the whole document.
    async fn read(&self) -> Result<Snapshot>;

    /// Replace the whole document with `contents`.
    ///
    /// Returns the hash of the new content.
    async fn replace(&self, contents: &[u8]) -> Result<ContentHash>;

    /// A short human-readable name for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<D: Document + ?Sized> Document for std::sync::Arc<D> {
    async fn read(&self) -> Result<Snapshot> {
        (**self).read().await
    }

    async fn replace(&self, contents: &[u8]) -> Result<ContentHash> {
        (**self).replace(contents).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Extension trait for common document patterns.
pub trait DocumentExt: Document {
    /// Hash of the current content.
    fn content_hash(&self) -> impl std::future::Future<Output = Result<ContentHash>> + Send;
}

impl<D: Document + ?Sized> DocumentExt for D {
    async fn content_hash(&self) -> Result<ContentHash> {
        Ok(self.read().await?.hash())
    }
}
