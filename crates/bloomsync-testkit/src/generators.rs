//! Proptest generators for property-based testing.

use proptest::prelude::*;

/// A line from a small alphabet, so duplicates are common.
pub fn dup_line() -> impl Strategy<Value = String> {
    "[a-d]{0,2}\n"
}

/// A line of printable text, sometimes with `\r\n`.
pub fn line() -> impl Strategy<Value = String> {
    ("[ -~]{0,40}", any::<bool>()).prop_map(|(body, crlf)| {
        if crlf {
            format!("{}\r\n", body)
        } else {
            format!("{}\n", body)
        }
    })
}

/// Up to `max_lines` lines with frequent duplicates.
pub fn file_lines(max_lines: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(dup_line(), 0..=max_lines)
}

/// A whole file of up to `max_lines` lines, possibly without a final newline.
pub fn file_text(max_lines: usize) -> impl Strategy<Value = String> {
    (prop::collection::vec(line(), 0..=max_lines), any::<bool>()).prop_map(|(lines, chop)| {
        let mut text = lines.concat();
        if chop && text.ends_with('\n') {
            text.pop();
        }
        text
    })
}

/// An initiator file of unique lines, and a responder file derived from it
/// by deleting lines and inserting new ones without reordering.
pub fn edited_pair() -> impl Strategy<Value = (String, String)> {
    (1usize..40)
        .prop_flat_map(|n| {
            (
                Just(n),
                prop::collection::vec(any::<bool>(), n),
                prop::collection::vec(0usize..=n, 0..8),
            )
        })
        .prop_map(|(n, keep, inserts)| {
            let initiator: Vec<String> = (0..n).map(|i| format!("line {}\n", i)).collect();
            let mut responder: Vec<String> = initiator
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(l, _)| l.clone())
                .collect();
            for (j, at) in inserts.into_iter().enumerate() {
                let at = at.min(responder.len());
                responder.insert(at, format!("edit {}\n", j));
            }
            (initiator.concat(), responder.concat())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomsync_core::split_lines;

    proptest! {
        #[test]
        fn file_text_is_valid_lines(text in file_text(20)) {
            let lines = split_lines(&text);
            prop_assert_eq!(lines.concat(), text.clone());
            for line in &lines[..lines.len().saturating_sub(1)] {
                prop_assert!(line.ends_with('\n'));
            }
        }

        #[test]
        fn edited_pair_keeps_shared_order((a, b) in edited_pair()) {
            let a_lines = split_lines(&a);
            let shared: Vec<&str> = split_lines(&b)
                .into_iter()
                .filter(|l| a_lines.contains(l))
                .collect();
            let mut it = a_lines.iter();
            for line in shared {
                prop_assert!(it.any(|l| *l == line));
            }
        }
    }
}
