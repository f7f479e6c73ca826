//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Protocol version mismatch with peer.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u8, peer: u8 },

    /// Message framing or validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Message exceeds a size limit.
    #[error("message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Transport-level error. The round is aborted.
    #[error("transport error: {0}")]
    Transport(String),

    /// Document operation failed.
    #[error("store error: {0}")]
    Store(#[from] bloomsync_store::StoreError),

    /// Filter or reconciliation failure.
    #[error("core error: {0}")]
    Core(#[from] bloomsync_core::CoreError),

    /// Peer is not connected.
    #[error("peer not connected: {0}")]
    PeerNotConnected(String),
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Transport(e.to_string())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
