//! Error types for the sync node.

use bloomsync_core::CoreError;
use bloomsync_store::StoreError;
use bloomsync_sync::SyncError;
use thiserror::Error;

/// Errors that can stop a sync node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Filter or reconciliation error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Document error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Protocol or transport error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The connection to the peer is gone.
    #[error("peer disconnected: {0}")]
    Disconnected(String),
}

impl NodeError {
    /// Classify a protocol error: connection loss stops the node, anything
    /// else only ends the current round.
    pub fn from_sync(error: SyncError) -> Self {
        match error {
            SyncError::Transport(reason) => NodeError::Disconnected(reason),
            SyncError::PeerNotConnected(peer) => NodeError::Disconnected(peer),
            SyncError::Core(e) => NodeError::Core(e),
            SyncError::Store(e) => NodeError::Store(e),
            other => NodeError::Sync(other),
        }
    }

    /// Check if the node cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NodeError::Disconnected(_))
    }
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
