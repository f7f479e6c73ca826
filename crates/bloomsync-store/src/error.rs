//! Error types for the store module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during document operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The synchronized path is missing or not a regular file.
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    /// The document content is not valid text.
    #[error("invalid content: {0}")]
    Content(#[from] bloomsync_core::CoreError),

    /// A blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
