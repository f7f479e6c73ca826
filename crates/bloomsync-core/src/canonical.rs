//! Canonical encoding for missing-content maps.
//!
//! A map is encoded as a deterministic CBOR array of
//! `[line_number, text]` pairs in ascending line order:
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//! - Text is a length-prefixed UTF-8 string
//!
//! Decoding treats the payload as untrusted and validates every record
//! before anything reaches the merge step.

use ciborium::value::Value;
use std::io::Cursor;

use crate::error::{CoreError, Result};
use crate::types::MissingContent;

/// Encode a missing-content map to canonical bytes.
pub fn encode_missing(missing: &MissingContent) -> Vec<u8> {
    let mut buf = Vec::with_capacity(missing.text_bytes() + 4 * missing.len() + 9);
    encode_uint(&mut buf, 4, missing.len() as u64);
    for (line_number, text) in missing.iter() {
        encode_uint(&mut buf, 4, 2);
        encode_uint(&mut buf, 0, line_number);
        encode_text(&mut buf, text);
    }
    buf
}

/// Decode and validate a missing-content payload.
///
/// Rejects anything that is not an array of `[uint >= 1, text]` pairs with
/// strictly ascending line numbers, non-empty single-line texts, no
/// trailing bytes, and at most `max_entries` records.
pub fn decode_missing(bytes: &[u8], max_entries: usize) -> Result<MissingContent> {
    let mut cursor = Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(&mut cursor).map_err(|e| CoreError::Decoding(e.to_string()))?;

    if cursor.position() as usize != bytes.len() {
        return Err(CoreError::Decoding(format!(
            "{} trailing bytes",
            bytes.len() - cursor.position() as usize
        )));
    }

    let entries = match value {
        Value::Array(entries) => entries,
        _ => return Err(CoreError::Decoding("expected array".into())),
    };

    if entries.len() > max_entries {
        return Err(CoreError::LimitExceeded {
            what: "missing lines",
            size: entries.len(),
            max: max_entries,
        });
    }

    let mut missing = MissingContent::new();
    let mut last_line = 0u64;

    for entry in entries {
        let (line_number, text) = decode_entry(entry)?;

        if line_number <= last_line {
            return Err(CoreError::Decoding(format!(
                "line {} out of order after {}",
                line_number, last_line
            )));
        }
        last_line = line_number;

        missing.insert(line_number, text);
    }

    Ok(missing)
}

/// Decode one `[line_number, text]` record.
fn decode_entry(entry: Value) -> Result<(u64, String)> {
    let mut pair = match entry {
        Value::Array(pair) if pair.len() == 2 => pair,
        _ => return Err(CoreError::Decoding("expected [line, text] pair".into())),
    };

    let text = match pair.pop() {
        Some(Value::Text(text)) => text,
        _ => return Err(CoreError::Decoding("line text must be a string".into())),
    };

    let line_number = match pair.pop() {
        Some(Value::Integer(i)) => u64::try_from(i)
            .map_err(|_| CoreError::Decoding("line number out of range".into()))?,
        _ => return Err(CoreError::Decoding("line number must be an integer".into())),
    };

    if line_number == 0 {
        return Err(CoreError::Decoding("line numbers are 1-based".into()));
    }

    // A record is exactly one line: non-empty, and a newline only at the end.
    let body = text.strip_suffix('\n').unwrap_or(&text);
    if text.is_empty() || body.contains('\n') {
        return Err(CoreError::Decoding(format!(
            "line {} is not a single line",
            line_number
        )));
    }

    Ok((line_number, text))
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1000;

    fn sample() -> MissingContent {
        let mut missing = MissingContent::new();
        missing.insert(3, "z\n");
        missing.insert(40, "a longer line with spaces\n");
        missing.insert(70000, "tail without newline");
        missing
    }

    #[test]
    fn test_encoding_deterministic() {
        assert_eq!(encode_missing(&sample()), encode_missing(&sample()));
    }

    #[test]
    fn test_roundtrip() {
        let missing = sample();
        let decoded = decode_missing(&encode_missing(&missing), MAX).unwrap();
        assert_eq!(decoded, missing);
    }

    #[test]
    fn test_empty_map() {
        let bytes = encode_missing(&MissingContent::new());
        assert_eq!(bytes, vec![0x80]);
        assert!(decode_missing(&bytes, MAX).unwrap().is_empty());
    }

    #[test]
    fn test_known_bytes() {
        let mut missing = MissingContent::new();
        missing.insert(3, "z\n");
        // [[3, "z\n"]]
        assert_eq!(
            encode_missing(&missing),
            vec![0x81, 0x82, 0x03, 0x62, b'z', b'\n']
        );
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = encode_missing(&sample());
        bytes.push(0x00);
        assert!(matches!(
            decode_missing(&bytes, MAX),
            Err(CoreError::Decoding(_))
        ));
    }

    #[test]
    fn test_rejects_unordered_lines() {
        // [[5, "a"], [2, "b"]]
        let bytes = vec![0x82, 0x82, 0x05, 0x61, b'a', 0x82, 0x02, 0x61, b'b'];
        assert!(decode_missing(&bytes, MAX).is_err());
    }

    #[test]
    fn test_rejects_line_zero() {
        // [[0, "a"]]
        let bytes = vec![0x81, 0x82, 0x00, 0x61, b'a'];
        assert!(decode_missing(&bytes, MAX).is_err());
    }

    #[test]
    fn test_rejects_embedded_newline() {
        // [[1, "a\nb"]]
        let bytes = vec![0x81, 0x82, 0x01, 0x63, b'a', b'\n', b'b'];
        assert!(decode_missing(&bytes, MAX).is_err());
    }

    #[test]
    fn test_rejects_bytes_instead_of_text() {
        // [[1, h'61']]
        let bytes = vec![0x81, 0x82, 0x01, 0x41, b'a'];
        assert!(decode_missing(&bytes, MAX).is_err());
    }

    #[test]
    fn test_rejects_map_payload() {
        // {1: "a"}
        let bytes = vec![0xa1, 0x01, 0x61, b'a'];
        assert!(decode_missing(&bytes, MAX).is_err());
    }

    #[test]
    fn test_rejects_too_many_entries() {
        let missing: MissingContent = (1..=5u64).map(|n| (n, format!("{}\n", n))).collect();
        assert!(matches!(
            decode_missing(&encode_missing(&missing), 4),
            Err(CoreError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decode_missing(b"not cbor at all", MAX).is_err());
        assert!(decode_missing(&[], MAX).is_err());
    }
}
