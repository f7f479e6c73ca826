//! Reconciliation engine.
//!
//! Builds a filter over a file's lines and, given a peer's filter, finds
//! the local lines the peer does not have.
//!
//! Duplicate lines are judged per occurrence in scan order: if the peer
//! holds two copies of a line and we hold three, our third copy (by
//! position) is missing, whichever physical copy the peer "really" lacks.

use crate::error::{CoreError, Result};
use crate::filter::{byte_len_for, capacity_for_byte_len, BloomFilter, DEFAULT_FALSE_POSITIVE_RATE};
use crate::lines::occurrence_keys;
use crate::types::MissingContent;

/// Builds and compares line filters at a fixed false-positive rate.
///
/// Both peers must agree on the rate; it is not transmitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciler {
    false_positive_rate: f64,
}

impl Reconciler {
    /// Create a reconciler for the given false-positive rate.
    pub fn new(false_positive_rate: f64) -> Result<Self> {
        // Validates the rate.
        byte_len_for(1, false_positive_rate)?;
        Ok(Self {
            false_positive_rate,
        })
    }

    /// The false-positive rate filters are sized for.
    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// Build a filter holding every `(line, occurrence)` key of `lines`.
    ///
    /// An empty file yields a filter sized for one element with no bits set.
    pub fn build_filter(&self, lines: &[&str]) -> Result<BloomFilter> {
        let mut filter = BloomFilter::with_rate(lines.len().max(1), self.false_positive_rate)?;
        for key in occurrence_keys(lines) {
            filter.insert(key.text, key.occurrence);
        }
        tracing::trace!(lines = lines.len(), filter = ?filter, "built line filter");
        Ok(filter)
    }

    /// Element count a peer filter of `num_bytes` bytes was sized for.
    pub fn element_count_hint(&self, num_bytes: usize) -> usize {
        capacity_for_byte_len(num_bytes, self.false_positive_rate)
    }

    /// Rebuild a peer's filter from its wire bytes.
    ///
    /// If `element_count_hint` is given, it must describe a filter of the
    /// same byte length.
    pub fn peer_filter(
        &self,
        peer_filter_bytes: &[u8],
        element_count_hint: Option<usize>,
    ) -> Result<BloomFilter> {
        if let Some(hint) = element_count_hint {
            let expected = byte_len_for(hint.max(1), self.false_positive_rate)?;
            if expected != peer_filter_bytes.len() {
                return Err(CoreError::DeserializationMismatch {
                    expected,
                    got: peer_filter_bytes.len(),
                });
            }
        }
        BloomFilter::from_slice(peer_filter_bytes, self.false_positive_rate)
    }

    /// Local lines whose occurrence key the peer filter does not contain.
    pub fn compute_missing(
        &self,
        local_lines: &[&str],
        peer_filter_bytes: &[u8],
        element_count_hint: Option<usize>,
    ) -> Result<MissingContent> {
        let filter = self.peer_filter(peer_filter_bytes, element_count_hint)?;
        Ok(self.missing_against(local_lines, &filter))
    }

    /// Local lines whose occurrence key `filter` does not contain.
    pub fn missing_against(&self, local_lines: &[&str], filter: &BloomFilter) -> MissingContent {
        occurrence_keys(local_lines)
            .into_iter()
            .filter(|key| !filter.contains(key.text, key.occurrence))
            .map(|key| (key.line_number, key.text.to_string()))
            .collect()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::split_lines;

    #[test]
    fn test_self_reconciliation_is_empty() {
        let rec = Reconciler::default();
        let lines = split_lines("x\ny\nz\nx\n");
        let filter = rec.build_filter(&lines).unwrap();

        let missing = rec
            .compute_missing(&lines, filter.as_bytes(), Some(lines.len()))
            .unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_duplicate_third_occurrence_missing() {
        let rec = Reconciler::default();
        let peer = split_lines("a\na\n");
        let local = split_lines("a\na\na\n");

        let peer_filter = rec.build_filter(&peer).unwrap();
        let missing = rec.missing_against(&local, &peer_filter);

        assert_eq!(missing.len(), 1);
        assert_eq!(missing.get(3), Some("a\n"));
    }

    #[test]
    fn test_changed_line_detected() {
        let rec = Reconciler::default();
        let a = split_lines("x\ny\nz\n");
        let b = split_lines("x\ny\nw\n");

        let filter_a = rec.build_filter(&a).unwrap();
        let missing = rec.missing_against(&b, &filter_a);

        assert_eq!(missing.len(), 1);
        assert_eq!(missing.get(3), Some("w\n"));
    }

    #[test]
    fn test_empty_peer_file_misses_everything() {
        let rec = Reconciler::default();
        let filter = rec.build_filter(&[]).unwrap();
        assert!(filter.is_empty());

        let local = split_lines("a\nb\n");
        let missing = rec.missing_against(&local, &filter);
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_hint_mismatch_rejected() {
        let rec = Reconciler::default();
        let lines = split_lines("a\nb\nc\n");
        let filter = rec.build_filter(&lines).unwrap();

        let result = rec.compute_missing(&lines, filter.as_bytes(), Some(500));
        assert!(matches!(
            result,
            Err(CoreError::DeserializationMismatch { .. })
        ));
    }

    #[test]
    fn test_hint_from_byte_length_roundtrips() {
        let rec = Reconciler::default();
        for n in 1..300usize {
            let lines: Vec<String> = (0..n).map(|i| format!("{}\n", i)).collect();
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let filter = rec.build_filter(&refs).unwrap();
            let hint = rec.element_count_hint(filter.num_bytes());
            assert!(hint >= n);
            assert!(rec.compute_missing(&refs, filter.as_bytes(), Some(hint)).is_ok());
        }
    }

    #[test]
    fn test_empty_peer_bytes_rejected() {
        let rec = Reconciler::default();
        assert!(matches!(
            rec.compute_missing(&["a\n"], &[], None),
            Err(CoreError::EmptyFilter)
        ));
    }
}
