//! Golden vectors for cross-implementation verification.
//!
//! Every implementation of the protocol must produce identical:
//! - filter bytes for a given list of lines
//! - missing-content payload bytes
//! - frame bytes for each message type
//! - whole-file hashes

use bloomsync::core::{encode_missing, Fingerprint};
use bloomsync::sync::{encode_frame, SyncMessage, PROTOCOL_VERSION};
use bloomsync::{BloomFilter, ContentHash, MissingContent, Reconciler};
use bloomsync_testkit::vectors::{hundred_lines, vectors_json};
use bloomsync_testkit::{all_vectors, filter_hex, verify_all_vectors};
use serde::Serialize;

#[test]
fn test_filter_vectors_verify() {
    for (name, ok) in verify_all_vectors() {
        assert!(ok, "filter vector failed: {}", name);
    }
}

#[test]
fn test_filter_vectors_deterministic() {
    for v in all_vectors() {
        assert_eq!(filter_hex(v.lines), filter_hex(v.lines), "{}", v.name);
        assert_eq!(filter_hex(v.lines), v.expected_filter, "{}", v.name);
    }

    let (lines, vector) = hundred_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    assert_eq!(filter_hex(&refs), vector.expected_filter);
}

#[test]
fn test_filter_parameters_from_length() {
    // A receiver knows only the byte length; it must land on the sender's shape.
    let (lines, vector) = hundred_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let sent = Reconciler::default().build_filter(&refs).unwrap();

    let received = BloomFilter::from_slice(sent.as_bytes(), 0.05).unwrap();
    assert_eq!(received.num_bytes(), vector.expected_bytes);
    assert_eq!(received.size_in_bits(), vector.expected_bits);
    assert_eq!(received.hash_count(), vector.expected_hash_count);
    for (i, line) in refs.iter().enumerate() {
        assert!(received.contains(line, 1), "line {} lost", i);
    }
}

#[test]
fn test_fingerprint_separates_occurrences() {
    assert_ne!(Fingerprint::of("a\n", 1), Fingerprint::of("a\n", 2));
    assert_ne!(Fingerprint::of("a\n", 1), Fingerprint::of("a", 1));
    assert_eq!(Fingerprint::of("a\n", 2), Fingerprint::of("a\n", 2));
}

#[test]
fn test_file_hash_vectors() {
    assert_eq!(
        ContentHash::hash(b"").to_hex(),
        "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
    );
    assert_eq!(ContentHash::hash(b""), ContentHash::empty());
    assert_ne!(ContentHash::hash(b"x\n"), ContentHash::hash(b"x"));
}

#[test]
fn test_missing_content_payload_bytes() {
    let mut missing = MissingContent::new();
    missing.insert(3, "z\n");
    missing.insert(300, "tail");

    assert_eq!(
        hex::encode(encode_missing(&missing)),
        // [[3, "z\n"], [300, "tail"]]
        "82820362 7a0a 8219012c 647461696c".replace(' ', "")
    );
}

#[test]
fn test_frame_bytes() {
    let frame = encode_frame(&SyncMessage::Verified).unwrap();
    assert_eq!(&frame[..], &[PROTOCOL_VERSION, 5, 0, 0, 0, 0]);

    let frame = encode_frame(&SyncMessage::FullFileRequest).unwrap();
    assert_eq!(&frame[..], &[PROTOCOL_VERSION, 6, 0, 0, 0, 0]);

    let frame = encode_frame(&SyncMessage::FilterRequest {
        filter: vec![0x93, 0xb8, 0xcf].into(),
    })
    .unwrap();
    assert_eq!(hex::encode(&frame), "00010000000393b8cf");

    let frame = encode_frame(&SyncMessage::FilterReply {
        filter: vec![0x00].into(),
    })
    .unwrap();
    assert_eq!(hex::encode(&frame), "00020000000100");

    let mut missing = MissingContent::new();
    missing.insert(3, "z\n");
    let frame = encode_frame(&SyncMessage::missing_content(&missing)).unwrap();
    assert_eq!(hex::encode(&frame), "000300000006818203627a0a");

    let frame = encode_frame(&SyncMessage::FileHash {
        hash: ContentHash::empty(),
    })
    .unwrap();
    assert_eq!(
        hex::encode(&frame),
        "000400000020af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
    );

    let frame = encode_frame(&SyncMessage::EntireFile {
        contents: b"hi\n".to_vec().into(),
    })
    .unwrap();
    assert_eq!(hex::encode(&frame), "00070000000368690a");
}

#[test]
fn print_golden_vectors_json() {
    #[derive(Serialize)]
    struct VectorFile {
        version: u8,
        description: String,
        false_positive_rate: f64,
        vectors: serde_json::Value,
    }

    let vectors: serde_json::Value = serde_json::from_str(&vectors_json().unwrap()).unwrap();
    let file = VectorFile {
        version: PROTOCOL_VERSION,
        description: "Filter vectors. Every implementation must produce identical bytes.".into(),
        false_positive_rate: 0.05,
        vectors,
    };

    let json = serde_json::to_string_pretty(&file).unwrap();
    assert!(json.contains("93b8cf"));
    println!("{}", json);
}
