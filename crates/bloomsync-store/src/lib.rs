//! # Bloomsync Store
//!
//! Access to the one file two peers keep synchronized.
//!
//! ## Overview
//!
//! The protocol never edits a file in place. It reads whole [`Snapshot`]s
//! and writes whole replacements through the [`Document`] trait, so a
//! round either installs a complete merge result or nothing.
//!
//! ## Key Types
//!
//! - [`Document`] - The async trait for snapshot reads and whole-file writes
//! - [`FileDocument`] - A file on disk, replaced by atomic rename
//! - [`MemoryDocument`] - In-memory document for tests
//! - [`Snapshot`] - Content plus its hash, read at one point in time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bloomsync_store::{Document, FileDocument};
//!
//! async fn example() {
//!     let doc = FileDocument::open("notes.txt").unwrap();
//!     let snapshot = doc.read().await.unwrap();
//!     println!("{} lines, hash {}", snapshot.lines().unwrap().len(), snapshot.hash());
//! }
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{Result, StoreError};
pub use file::FileDocument;
pub use memory::MemoryDocument;
pub use snapshot::Snapshot;
pub use traits::{Document, DocumentExt};
