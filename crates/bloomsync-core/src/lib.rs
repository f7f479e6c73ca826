//! # Bloomsync Core
//!
//! Pure primitives for synchronizing one text file between two peers:
//! occurrence-keyed Bloom filters, the reconciliation engine, content
//! hashing, and the canonical missing-content encoding.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`BloomFilter`] - Insert-only membership filter over `(line, occurrence)` keys
//! - [`Reconciler`] - Builds filters and derives the lines a peer is missing
//! - [`MissingContent`] - Line number to line text, ascending
//! - [`ContentHash`] - Blake3 hash of a whole file
//!
//! ## Example
//!
//! ```rust
//! use bloomsync_core::{split_lines, Reconciler};
//!
//! let rec = Reconciler::default();
//! let ours = split_lines("x\ny\nz\n");
//! let theirs = split_lines("x\ny\nw\n");
//!
//! let their_filter = rec.build_filter(&theirs).unwrap();
//! let missing = rec.missing_against(&ours, &their_filter);
//! assert_eq!(missing.get(3), Some("z\n"));
//! ```

pub mod canonical;
pub mod error;
pub mod filter;
pub mod hash;
pub mod lines;
pub mod reconcile;
pub mod types;

pub use canonical::{decode_missing, encode_missing};
pub use error::{CoreError, Result};
pub use filter::{
    byte_len_for, capacity_for_byte_len, design_bits, BloomFilter, DEFAULT_FALSE_POSITIVE_RATE,
};
pub use hash::{ContentHash, Fingerprint};
pub use lines::{lines_from_bytes, occurrence_keys, split_lines, LineKey, OccurrenceCounter};
pub use reconcile::Reconciler;
pub use types::MissingContent;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Files drawn from a small alphabet so duplicates are common.
    fn file_lines() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-d]{0,2}\n", 0..64)
    }

    proptest! {
        #[test]
        fn no_false_negatives(lines in file_lines()) {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let rec = Reconciler::default();
            let filter = rec.build_filter(&refs).unwrap();

            for key in occurrence_keys(&refs) {
                prop_assert!(filter.contains(key.text, key.occurrence));
            }
        }

        #[test]
        fn self_reconciliation_reports_nothing(lines in file_lines()) {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let rec = Reconciler::default();
            let filter = rec.build_filter(&refs).unwrap();
            let hint = rec.element_count_hint(filter.num_bytes());

            let missing = rec.compute_missing(&refs, filter.as_bytes(), Some(hint)).unwrap();
            prop_assert!(missing.is_empty());
        }

        #[test]
        fn serialized_filter_answers_identically(
            lines in file_lines(),
            probes in prop::collection::vec(("[a-f]{0,2}\n", 1u64..5), 0..64),
        ) {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let rec = Reconciler::default();
            let filter = rec.build_filter(&refs).unwrap();
            let rebuilt = BloomFilter::from_slice(filter.as_bytes(), rec.false_positive_rate()).unwrap();

            prop_assert_eq!(&rebuilt, &filter);
            for (line, occurrence) in &probes {
                prop_assert_eq!(rebuilt.contains(line, *occurrence), filter.contains(line, *occurrence));
            }
        }

        #[test]
        fn missing_entries_are_local_lines(
            ours in file_lines(),
            theirs in file_lines(),
        ) {
            let ours_refs: Vec<&str> = ours.iter().map(String::as_str).collect();
            let theirs_refs: Vec<&str> = theirs.iter().map(String::as_str).collect();
            let rec = Reconciler::default();
            let filter = rec.build_filter(&theirs_refs).unwrap();

            let missing = rec.missing_against(&ours_refs, &filter);
            for (line_number, text) in missing.iter() {
                prop_assert_eq!(ours_refs[(line_number - 1) as usize], text);
            }
        }
    }
}
