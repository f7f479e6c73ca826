//! On-disk implementation of the Document trait.
//!
//! Reads and writes run on tokio's blocking pool. Replacement writes a
//! temporary file in the same directory and renames it over the target, so
//! readers (including the peer's own filter builder) never see a partial
//! file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use bloomsync_core::ContentHash;

use crate::error::{Result, StoreError};
use crate::snapshot::Snapshot;
use crate::traits::Document;

/// A text file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    /// Open an existing regular file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = std::fs::canonicalize(path.as_ref())?;
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(StoreError::NotAFile(path));
        }
        Ok(Self { path })
    }

    /// The absolute path being synchronized.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Document for FileDocument {
    async fn read(&self) -> Result<Snapshot> {
        let path = self.path.clone();
        let bytes = tokio::task::spawn_blocking(move || std::fs::read(path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;
        Ok(Snapshot::new(bytes))
    }

    async fn replace(&self, contents: &[u8]) -> Result<ContentHash> {
        let path = self.path.clone();
        let contents = contents.to_vec();
        let hash = ContentHash::hash(&contents);

        tokio::task::spawn_blocking(move || write_atomically(&path, &contents))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        tracing::debug!(path = %self.path.display(), hash = %hash, "replaced document");
        Ok(hash)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::NotAFile(path.to_path_buf()))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }

    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
