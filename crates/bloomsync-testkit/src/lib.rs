//! # Bloomsync Testkit
//!
//! Testing utilities for bloomsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known filter bytes for fixed inputs, so any
//!   implementation can check its hashing and sizing bit for bit
//! - **Generators**: Proptest strategies for files and edits
//! - **Fixtures**: Two connected peers over an in-memory network, and a
//!   transport wrapper that tampers with messages
//!
//! ## Golden Vectors
//!
//! ```rust
//! use bloomsync_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "vector {} failed", name);
//! }
//! assert!(!all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use bloomsync_testkit::generators::file_lines;
//!
//! proptest! {
//!     #[test]
//!     fn filter_has_no_false_negatives(lines in file_lines(64)) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use bloomsync_testkit::fixtures::PeerPair;
//!
//! # async fn example() {
//! let pair = PeerPair::new("x\ny\nz\n", "x\ny\nw\n").await;
//! assert_eq!(pair.doc_a.contents(), b"x\ny\nz\n");
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{PeerPair, TamperingTransport, HIGH_NODE, LOW_NODE};
pub use generators::{edited_pair, file_lines, file_text};
pub use vectors::{all_vectors, filter_hex, verify_all_vectors, FilterVector};
