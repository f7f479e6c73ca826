//! Strong type definitions for reconciliation results.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Lines of a local file whose occurrence key is absent from a peer filter.
///
/// Keyed by 1-based line number in the file the lines came from, ordered
/// ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingContent(BTreeMap<u64, String>);

impl MissingContent {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line. Returns the previous text at that position, if any.
    pub fn insert(&mut self, line_number: u64, text: impl Into<String>) -> Option<String> {
        self.0.insert(line_number, text.into())
    }

    /// Remove a line.
    pub fn remove(&mut self, line_number: u64) -> Option<String> {
        self.0.remove(&line_number)
    }

    /// Get the text at a line number.
    pub fn get(&self, line_number: u64) -> Option<&str> {
        self.0.get(&line_number).map(String::as_str)
    }

    /// Check whether a line number is present.
    pub fn contains(&self, line_number: u64) -> bool {
        self.0.contains_key(&line_number)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no lines.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(line_number, text)` in ascending line order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.0.iter().map(|(n, t)| (*n, t.as_str()))
    }

    /// Line numbers in ascending order.
    pub fn line_numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.keys().copied()
    }

    /// Total text bytes across all lines.
    pub fn text_bytes(&self) -> usize {
        self.0.values().map(String::len).sum()
    }
}

impl FromIterator<(u64, String)> for MissingContent {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MissingContent {
    type Item = (u64, String);
    type IntoIter = btree_map::IntoIter<u64, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_content_ordered() {
        let mut missing = MissingContent::new();
        missing.insert(5, "e\n");
        missing.insert(2, "b\n");
        missing.insert(9, "i\n");

        let numbers: Vec<u64> = missing.line_numbers().collect();
        assert_eq!(numbers, vec![2, 5, 9]);
        assert_eq!(missing.get(5), Some("e\n"));
        assert_eq!(missing.text_bytes(), 6);
    }
}
