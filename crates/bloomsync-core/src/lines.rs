//! Line scanning with per-value occurrence counting.
//!
//! A line keeps its `\n` terminator. A trailing line without a terminator
//! is still a line, and an empty file has none.

use std::collections::HashMap;

use crate::error::Result;

/// Split text into lines, keeping terminators.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Decode file bytes as UTF-8 and split them into lines.
pub fn lines_from_bytes(bytes: &[u8]) -> Result<Vec<&str>> {
    let text = std::str::from_utf8(bytes)?;
    Ok(split_lines(text))
}

/// Scan-order tally of how many times each line value has been seen.
#[derive(Debug, Default)]
pub struct OccurrenceCounter<'a> {
    seen: HashMap<&'a str, u64>,
}

impl<'a> OccurrenceCounter<'a> {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more copy of `line` and return its 1-based occurrence index.
    pub fn next(&mut self, line: &'a str) -> u64 {
        let count = self.seen.entry(line).or_insert(0);
        *count += 1;
        *count
    }
}

/// A line together with its 1-based position and occurrence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineKey<'a> {
    /// 1-based position in the file.
    pub line_number: u64,
    /// The raw line text, terminator included.
    pub text: &'a str,
    /// 1-based count of this value so far in a top-to-bottom scan.
    pub occurrence: u64,
}

/// Walk `lines` top to bottom, yielding each line's occurrence key.
pub fn occurrence_keys<'a>(lines: &[&'a str]) -> Vec<LineKey<'a>> {
    let mut counter = OccurrenceCounter::new();
    lines
        .iter()
        .enumerate()
        .map(|(i, &text)| LineKey {
            line_number: i as u64 + 1,
            text,
            occurrence: counter.next(text),
        })
        .collect()
}
