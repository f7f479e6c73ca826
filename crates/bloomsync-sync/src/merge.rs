//! Applying a reconciliation result to the responder's file.
//!
//! The responder drops the lines the initiator does not have and splices
//! in the initiator's lines at the initiator's line numbers. When both
//! files order their shared lines the same way this reproduces the
//! initiator's file exactly. Otherwise the result differs, and hash
//! verification catches it.

use bloomsync_core::MissingContent;

/// Merge `incoming` lines into `local`, removing the `deficit` positions.
///
/// - `deficit` keys are 1-based positions in `local`; unknown positions
///   are ignored.
/// - `incoming` keys are 1-based positions in the initiator's file. Lines
///   are inserted in ascending order so each lands at its number; numbers
///   past the end are appended in order.
pub fn merge_lines(local: &[&str], deficit: &MissingContent, incoming: &MissingContent) -> String {
    let mut kept = local
        .iter()
        .enumerate()
        .filter(|(i, _)| !deficit.contains(*i as u64 + 1))
        .map(|(_, line)| *line);

    let mut merged: Vec<&str> = Vec::with_capacity(local.len() + incoming.len());
    for (line_number, text) in incoming.iter() {
        let target = (line_number - 1) as usize;
        while merged.len() < target {
            match kept.next() {
                Some(line) => merged.push(line),
                None => break,
            }
        }
        merged.push(text);
    }
    merged.extend(kept);

    merged.concat()
}
