//! Sync protocol message types.
//!
//! These messages drive one reconciliation round between two peers.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use bloomsync_core::{encode_missing, ContentHash, MissingContent};

/// Unique identifier for a peer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random node ID.
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Message size limits.
pub mod limits {
    /// Max serialized filter length in bytes (about ten million lines at 5%).
    pub const MAX_FILTER_BYTES: usize = 8 * 1024 * 1024;
    /// Max records in one MissingContent payload.
    pub const MAX_MISSING_LINES: usize = 1_000_000;
    /// Max length of one line in a MissingContent payload.
    pub const MAX_LINE_BYTES: usize = 1024 * 1024;
    /// Max synchronized file size.
    pub const MAX_FILE_BYTES: usize = 64 * 1024 * 1024;
    /// Max encoded MissingContent payload: the file plus per-record framing.
    pub const MAX_MISSING_CONTENT_BYTES: usize = MAX_FILE_BYTES + 16 * MAX_MISSING_LINES;
    /// Max payload of any frame.
    pub const MAX_PAYLOAD_BYTES: usize = MAX_MISSING_CONTENT_BYTES;
}

/// Wire tag of each message variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    FilterRequest = 1,
    FilterReply = 2,
    MissingContent = 3,
    FileHash = 4,
    Verified = 5,
    FullFileRequest = 6,
    EntireFile = 7,
}

impl MessageType {
    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::FilterRequest),
            2 => Some(Self::FilterReply),
            3 => Some(Self::MissingContent),
            4 => Some(Self::FileHash),
            5 => Some(Self::Verified),
            6 => Some(Self::FullFileRequest),
            7 => Some(Self::EntireFile),
            _ => None,
        }
    }
}

/// Sync protocol messages.
///
/// Filter and missing-content payloads stay encoded until the state machine
/// decodes them, so a malformed payload is handled as a protocol event
/// rather than a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    /// Initiator's filter over its lines; opens a round.
    FilterRequest {
        /// Filter bit array.
        filter: Bytes,
    },

    /// Responder's filter over its lines.
    FilterReply {
        /// Filter bit array.
        filter: Bytes,
    },

    /// Initiator's lines the responder's filter lacks.
    MissingContent {
        /// Canonically encoded line-number to text map.
        payload: Bytes,
    },

    /// Hash of the responder's file after merging.
    FileHash {
        /// Whole-file content hash.
        hash: ContentHash,
    },

    /// Initiator confirms the hashes matched.
    Verified,

    /// The sender could not reconcile and wants the whole file.
    FullFileRequest,

    /// The sender's whole file, to be written verbatim.
    EntireFile {
        /// Raw file bytes.
        contents: Bytes,
    },
}

impl SyncMessage {
    /// Build a MissingContent message from a decoded map.
    pub fn missing_content(missing: &MissingContent) -> Self {
        SyncMessage::MissingContent {
            payload: Bytes::from(encode_missing(missing)),
        }
    }

    /// The message's wire type.
    pub fn message_type(&self) -> MessageType {
        match self {
            SyncMessage::FilterRequest { .. } => MessageType::FilterRequest,
            SyncMessage::FilterReply { .. } => MessageType::FilterReply,
            SyncMessage::MissingContent { .. } => MessageType::MissingContent,
            SyncMessage::FileHash { .. } => MessageType::FileHash,
            SyncMessage::Verified => MessageType::Verified,
            SyncMessage::FullFileRequest => MessageType::FullFileRequest,
            SyncMessage::EntireFile { .. } => MessageType::EntireFile,
        }
    }

    /// Payload length on the wire.
    pub fn payload_len(&self) -> usize {
        match self {
            SyncMessage::FilterRequest { filter } | SyncMessage::FilterReply { filter } => {
                filter.len()
            }
            SyncMessage::MissingContent { payload } => payload.len(),
            SyncMessage::FileHash { .. } => ContentHash::LEN,
            SyncMessage::Verified | SyncMessage::FullFileRequest => 0,
            SyncMessage::EntireFile { contents } => contents.len(),
        }
    }

    /// Check if this message respects size limits.
    pub fn validate_limits(&self) -> Result<(), &'static str> {
        match self {
            SyncMessage::FilterRequest { filter } | SyncMessage::FilterReply { filter } => {
                if filter.len() > limits::MAX_FILTER_BYTES {
                    return Err("filter too large");
                }
            }
            SyncMessage::MissingContent { payload } => {
                if payload.len() > limits::MAX_MISSING_CONTENT_BYTES {
                    return Err("missing content too large");
                }
            }
            SyncMessage::EntireFile { contents } => {
                if contents.len() > limits::MAX_FILE_BYTES {
                    return Err("file too large");
                }
            }
            SyncMessage::FileHash { .. } | SyncMessage::Verified | SyncMessage::FullFileRequest => {}
        }
        Ok(())
    }

    /// Max payload length for a message type.
    pub fn max_payload_len(message_type: MessageType) -> usize {
        match message_type {
            MessageType::FilterRequest | MessageType::FilterReply => limits::MAX_FILTER_BYTES,
            MessageType::MissingContent => limits::MAX_MISSING_CONTENT_BYTES,
            MessageType::FileHash => ContentHash::LEN,
            MessageType::Verified | MessageType::FullFileRequest => 0,
            MessageType::EntireFile => limits::MAX_FILE_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for tag in 1..=7u8 {
            let ty = MessageType::from_tag(tag).unwrap();
            assert_eq!(ty.tag(), tag);
        }
        assert_eq!(MessageType::from_tag(0), None);
        assert_eq!(MessageType::from_tag(8), None);
    }

    #[test]
    fn test_node_id_ordering() {
        let low = NodeId::from_bytes([0x01; 32]);
        let high = NodeId::from_bytes([0x02; 32]);
        assert!(low < high);
        assert_eq!(low.to_string(), "0101010101010101");
    }

    #[test]
    fn test_filter_limit() {
        let ok = SyncMessage::FilterRequest {
            filter: Bytes::from(vec![0u8; 16]),
        };
        assert!(ok.validate_limits().is_ok());

        let too_big = SyncMessage::FilterReply {
            filter: Bytes::from(vec![0u8; limits::MAX_FILTER_BYTES + 1]),
        };
        assert_eq!(too_big.validate_limits(), Err("filter too large"));
    }

    #[test]
    fn test_missing_content_constructor() {
        let mut missing = MissingContent::new();
        missing.insert(3, "z\n");
        let msg = SyncMessage::missing_content(&missing);
        assert_eq!(msg.message_type(), MessageType::MissingContent);
        assert_eq!(msg.payload_len(), 6);
    }
}
