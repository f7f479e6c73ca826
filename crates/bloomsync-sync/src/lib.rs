//! # Bloomsync Sync
//!
//! Protocol for keeping one text file identical on two peers.
//!
//! ## Overview
//!
//! Peers exchange Bloom filters over their lines instead of the lines
//! themselves, send each other only what the filters say is missing, and
//! confirm the result with a whole-file hash. A false positive can hide a
//! changed line from the exchange; the hash check catches that and the
//! initiator sends its whole file instead.
//!
//! ## Key Properties
//!
//! - **One round at a time**: a change noticed mid-round waits for the
//!   next round
//! - **Initiator wins**: the responder adopts the initiator's content
//! - **Always converges**: every round ends with equal hashes, a full-file
//!   transfer, or a timeout
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bloomsync_store::MemoryDocument;
//! use bloomsync_sync::{MemoryNetwork, NodeId, SyncConfig, SyncPeer};
//!
//! async fn example() -> bloomsync_sync::Result<()> {
//!     let (a, b) = (NodeId::random(), NodeId::random());
//!     let network = MemoryNetwork::new();
//!     let (transport, _other_end) = network.pair(a, b).await;
//!
//!     let document = Arc::new(MemoryDocument::new("notes", "x\ny\n"));
//!     let mut peer = SyncPeer::new(document, transport, b, SyncConfig::default())?;
//!
//!     peer.on_local_change().await?;
//!     while peer.is_busy() {
//!         peer.poll_once(std::time::Duration::from_secs(1)).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Initiator                            Responder
//!   |-------- FilterRequest ----------->|   responder computes its deficit
//!   |<------- FilterReply --------------|
//!   |-------- MissingContent ---------->|   responder merges and writes
//!   |<------- FileHash -----------------|
//!   |-------- Verified ---------------->|   hashes matched
//!   |   or                              |
//!   |-------- EntireFile -------------->|   hashes differed
//! ```
//!
//! A peer that cannot decode a payload sends `FullFileRequest` and the
//! other side answers with `EntireFile`.

pub mod convergence;
pub mod error;
pub mod merge;
pub mod messages;
pub mod protocol;
pub mod transport;
pub mod wire;

pub use convergence::{verify_convergence, verify_document, ConvergenceResult};
pub use error::{Result, SyncError};
pub use merge::merge_lines;
pub use messages::{limits, MessageType, NodeId, SyncMessage, PROTOCOL_VERSION};
pub use protocol::{
    LocalChange, Role, RoundOutcome, RoundReport, SyncConfig, SyncPeer, SyncState,
};
pub use transport::{
    memory::MemoryNetwork, memory::MemoryTransport, stream::StreamTransport, Transport,
};
pub use wire::{decode_frame, encode_frame, FrameDecoder, FrameHeader, HEADER_LEN};
