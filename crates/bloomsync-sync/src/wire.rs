//! Wire framing for sync messages.
//!
//! Every frame is `[version: u8][tag: u8][len: u32 BE][payload]`. Lengths
//! are checked against the per-type limit from the header alone, so an
//! oversized frame is rejected before its payload is buffered.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use bloomsync_core::ContentHash;

use crate::error::{Result, SyncError};
use crate::messages::{MessageType, SyncMessage, PROTOCOL_VERSION};

/// Length of the frame header.
pub const HEADER_LEN: usize = 6;

/// A parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message type.
    pub message_type: MessageType,
    /// Payload length.
    pub len: usize,
}

impl FrameHeader {
    /// Parse and validate a header from the first [`HEADER_LEN`] bytes.
    pub fn parse(header: &[u8]) -> Result<Self> {
        if header.len() < HEADER_LEN {
            return Err(SyncError::InvalidMessage(format!(
                "frame header truncated: {} bytes",
                header.len()
            )));
        }

        if header[0] != PROTOCOL_VERSION {
            return Err(SyncError::VersionMismatch {
                local: PROTOCOL_VERSION,
                peer: header[0],
            });
        }

        let message_type = MessageType::from_tag(header[1])
            .ok_or_else(|| SyncError::InvalidMessage(format!("unknown tag {}", header[1])))?;

        let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
        let max = SyncMessage::max_payload_len(message_type);
        if len > max {
            return Err(SyncError::MessageTooLarge { size: len, max });
        }
        if message_type == MessageType::FileHash && len != ContentHash::LEN {
            return Err(SyncError::InvalidMessage(format!(
                "file hash payload must be {} bytes, got {}",
                ContentHash::LEN,
                len
            )));
        }

        Ok(Self { message_type, len })
    }

    /// Total frame length including the header.
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.len
    }
}

/// Encode a message into one frame.
pub fn encode_frame(message: &SyncMessage) -> Result<Bytes> {
    message
        .validate_limits()
        .map_err(|e| SyncError::InvalidMessage(e.into()))?;

    let len = message.payload_len();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + len);
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u8(message.message_type().tag());
    buf.put_u32(len as u32);

    match message {
        SyncMessage::FilterRequest { filter } | SyncMessage::FilterReply { filter } => {
            buf.put_slice(filter)
        }
        SyncMessage::MissingContent { payload } => buf.put_slice(payload),
        SyncMessage::FileHash { hash } => buf.put_slice(hash.as_bytes()),
        SyncMessage::Verified | SyncMessage::FullFileRequest => {}
        SyncMessage::EntireFile { contents } => buf.put_slice(contents),
    }

    Ok(buf.freeze())
}

/// Decode one complete frame.
///
/// `frame` must be exactly one frame; use [`FrameHeader::parse`] to find
/// its length in a stream.
pub fn decode_frame(frame: Bytes) -> Result<SyncMessage> {
    let header = FrameHeader::parse(&frame)?;
    if frame.len() != header.frame_len() {
        return Err(SyncError::InvalidMessage(format!(
            "frame length {} does not match header length {}",
            frame.len(),
            header.frame_len()
        )));
    }

    let payload = frame.slice(HEADER_LEN..);
    let message = match header.message_type {
        MessageType::FilterRequest => SyncMessage::FilterRequest { filter: payload },
        MessageType::FilterReply => SyncMessage::FilterReply { filter: payload },
        MessageType::MissingContent => SyncMessage::MissingContent { payload },
        MessageType::FileHash => {
            let hash = ContentHash::try_from(&payload[..])
                .map_err(|_| SyncError::InvalidMessage("bad file hash".into()))?;
            SyncMessage::FileHash { hash }
        }
        MessageType::Verified => SyncMessage::Verified,
        MessageType::FullFileRequest => SyncMessage::FullFileRequest,
        MessageType::EntireFile => SyncMessage::EntireFile { contents: payload },
    };

    Ok(message)
}

/// Incremental decoder for a stream of frames.
///
/// A frame with a known version and type that breaks a length rule is
/// skipped whole, even while its payload is still arriving, and decoding
/// resumes at the next frame. A bad version or unknown type leaves no way
/// to find the next frame boundary; the decoder then fails permanently
/// with [`SyncError::Transport`].
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
    /// Bytes of a rejected frame not yet discarded.
    skip: usize,
    desynced: bool,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(8 * 1024),
            skip: 0,
            desynced: false,
        }
    }

    /// The read buffer, for appending bytes from the stream.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Append received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decode the next complete frame, if one is buffered.
    ///
    /// Any error other than [`SyncError::Transport`] means one frame was
    /// dropped; calling again continues with the frame after it.
    pub fn decode(&mut self) -> Result<Option<SyncMessage>> {
        if self.desynced {
            return Err(SyncError::Transport("frame stream out of sync".into()));
        }
        self.discard();
        if self.skip > 0 || self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = match FrameHeader::parse(&self.buf[..HEADER_LEN]) {
            Ok(header) => header,
            Err(e) => return Err(self.reject(e)),
        };
        if self.buf.len() < header.frame_len() {
            self.buf.reserve(header.frame_len() - self.buf.len());
            return Ok(None);
        }

        let frame = self.buf.split_to(header.frame_len()).freeze();
        decode_frame(frame).map(Some)
    }

    /// Drop the rejected frame at the front of the buffer, or give up on the
    /// stream if its length cannot be trusted.
    fn reject(&mut self, error: SyncError) -> SyncError {
        let head = &self.buf[..HEADER_LEN];
        if head[0] != PROTOCOL_VERSION || MessageType::from_tag(head[1]).is_none() {
            self.desynced = true;
            self.buf.clear();
            return SyncError::Transport(format!("unreadable frame: {}", error));
        }

        let len = u32::from_be_bytes([head[2], head[3], head[4], head[5]]) as usize;
        self.skip = HEADER_LEN.saturating_add(len);
        self.discard();
        error
    }

    fn discard(&mut self) {
        let n = self.skip.min(self.buf.len());
        self.buf.advance(n);
        self.skip -= n;
    }
}
