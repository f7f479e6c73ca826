//! Golden test vectors for deterministic filter construction.
//!
//! Each vector fixes a list of lines and the exact filter a peer must put
//! on the wire for it at the default false-positive rate. Both the sizing
//! arithmetic and the per-occurrence hashing feed into the bytes.

use serde::Serialize;

use bloomsync_core::{Reconciler, DEFAULT_FALSE_POSITIVE_RATE};

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct FilterVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The file's lines, terminators included.
    pub lines: &'static [&'static str],
    /// Expected serialized length.
    pub expected_bytes: usize,
    /// Expected number of addressable bits.
    pub expected_bits: usize,
    /// Expected hash rounds per key.
    pub expected_hash_count: u32,
    /// Expected filter bytes (hex). Empty for vectors that only pin sizing.
    pub expected_filter: &'static str,
}

const HUNDRED_LINES_FILTER: &str = concat!(
    "06367bf4c6d60d9586653e8acf7954fd0ff397d5867f134cf5bff1e30457cee9",
    "eff6e6dc4f6604658fd5b24e1e12b0cdf3eb7692eaa626290ad1d3ed6e7ece62",
    "b283a135ed92e50cd6ee0c0a02da",
);

/// Get all golden test vectors.
///
/// The hundred-line vector is listed separately because its lines are
/// generated; see [`hundred_lines`].
pub fn all_vectors() -> Vec<FilterVector> {
    vec![
        FilterVector {
            name: "empty file",
            lines: &[],
            expected_bytes: 1,
            expected_bits: 8,
            expected_hash_count: 6,
            expected_filter: "00",
        },
        FilterVector {
            name: "three distinct lines",
            lines: &["x\n", "y\n", "z\n"],
            expected_bytes: 3,
            expected_bits: 24,
            expected_hash_count: 6,
            expected_filter: "93b8cf",
        },
        FilterVector {
            name: "three copies of one line",
            lines: &["a\n", "a\n", "a\n"],
            expected_bytes: 3,
            expected_bits: 24,
            expected_hash_count: 6,
            expected_filter: "703722",
        },
        FilterVector {
            name: "crlf line and unterminated tail",
            lines: &["a\r\n", "tail"],
            expected_bytes: 2,
            expected_bits: 16,
            expected_hash_count: 6,
            expected_filter: "857e",
        },
    ]
}

/// `"line 0\n"` through `"line 99\n"` and their expected filter.
pub fn hundred_lines() -> (Vec<String>, FilterVector) {
    let lines = (0..100).map(|i| format!("line {}\n", i)).collect();
    let vector = FilterVector {
        name: "hundred distinct lines",
        lines: &[],
        expected_bytes: 78,
        expected_bits: 624,
        expected_hash_count: 5,
        expected_filter: HUNDRED_LINES_FILTER,
    };
    (lines, vector)
}

/// Build the default-rate filter for `lines` and return its hex bytes.
pub fn filter_hex(lines: &[&str]) -> String {
    let rec = Reconciler::default();
    match rec.build_filter(lines) {
        Ok(filter) => hex::encode(filter.as_bytes()),
        Err(_) => String::new(),
    }
}

/// Check one vector against `lines`.
pub fn verify_vector(vector: &FilterVector, lines: &[&str]) -> bool {
    let rec = match Reconciler::new(DEFAULT_FALSE_POSITIVE_RATE) {
        Ok(rec) => rec,
        Err(_) => return false,
    };
    let filter = match rec.build_filter(lines) {
        Ok(filter) => filter,
        Err(_) => return false,
    };

    filter.num_bytes() == vector.expected_bytes
        && filter.size_in_bits() == vector.expected_bits
        && filter.hash_count() == vector.expected_hash_count
        && (vector.expected_filter.is_empty()
            || hex::encode(filter.as_bytes()) == vector.expected_filter)
}

/// Verify every vector. Returns `(name, passed)` pairs.
pub fn verify_all_vectors() -> Vec<(&'static str, bool)> {
    let mut results: Vec<(&'static str, bool)> = all_vectors()
        .iter()
        .map(|v| (v.name, verify_vector(v, v.lines)))
        .collect();

    let (lines, vector) = hundred_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    results.push((vector.name, verify_vector(&vector, &refs)));

    results
}

/// Export the vectors as JSON for other implementations.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        for (name, ok) in verify_all_vectors() {
            assert!(ok, "vector failed: {}", name);
        }
    }

    #[test]
    fn test_filter_hex_matches_vector() {
        assert_eq!(filter_hex(&["x\n", "y\n", "z\n"]), "93b8cf");
    }

    #[test]
    fn test_vectors_export_as_json() {
        let json = vectors_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), all_vectors().len());
        assert_eq!(parsed[1]["expected_filter"], "93b8cf");
    }
}
