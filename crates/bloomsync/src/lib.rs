//! # Bloomsync
//!
//! Keep one text file identical on two peers by exchanging Bloom filters
//! over its lines rather than the lines themselves.
//!
//! ## Overview
//!
//! - **Filters**: each side summarizes its lines, keyed by value and
//!   occurrence, in a Bloom filter sized for a 5% false-positive rate
//! - **Reconciliation**: each side sends only the lines the other's filter
//!   lacks
//! - **Verification**: the merged file's hash is checked, and a mismatch
//!   falls back to sending the whole file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use bloomsync::{FileDocument, NodeConfig, NodeId, StreamTransport, SyncNode};
//! use tokio::io::{AsyncRead, AsyncWrite};
//!
//! async fn example<S>(socket: S) -> anyhow::Result<()>
//! where
//!     S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
//! {
//!     let transport = StreamTransport::handshake(socket, NodeId::random()).await?;
//!     let peer = transport.peer_id();
//!
//!     let document = FileDocument::open("notes.txt")?;
//!     let mut node = SyncNode::new(document, transport, peer, NodeConfig::default())?;
//!
//!     // Hand this to a file watcher.
//!     let changes = node.change_handle();
//!     changes.notify();
//!
//!     node.initial_sync().await?;
//!     node.run(tokio::time::sleep(Duration::from_secs(3600))).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `bloomsync::core` - Filters, reconciliation, hashing
//! - `bloomsync::store` - The document abstraction
//! - `bloomsync::sync` - Protocol, wire format and transports

pub mod error;
pub mod node;

// Re-export component crates
pub use bloomsync_core as core;
pub use bloomsync_store as store;
pub use bloomsync_sync as sync;

// Re-export main types for convenience
pub use error::{NodeError, Result};
pub use node::{LocalChangeHandle, NodeConfig, NodeSummary, SyncNode};

pub use bloomsync_core::{BloomFilter, ContentHash, MissingContent, Reconciler};
pub use bloomsync_store::{Document, FileDocument, MemoryDocument};
pub use bloomsync_sync::{
    LocalChange, MemoryNetwork, NodeId, RoundOutcome, RoundReport, StreamTransport, SyncConfig,
    Transport,
};
