use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: length (2) + tag (1) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Largest payload a header can describe (the length field also counts the tag).
pub const MAX_PAYLOAD: usize = u16::MAX as usize - 1;

/// Liveness probe the client sends to the device. Not a framed record.
pub const KEEPALIVE: [u8; 2] = [0x00, 0x00];

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Tag byte plus payload size.
    pub length: u16,
    /// Record type discriminator.
    pub tag: i8,
}

impl Header {
    /// Header for a payload of `payload_len` bytes.
    pub fn for_payload(tag: i8, payload_len: usize) -> Result<Self> {
        if payload_len > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self {
            length: (payload_len + 1) as u16,
            tag,
        })
    }

    /// Number of payload bytes following the header, or `None` for a zero
    /// length that cannot even cover the tag.
    pub fn payload_len(&self) -> Option<usize> {
        (self.length as usize).checked_sub(1)
    }
}

/// A frame whose payload has not been decoded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub tag: i8,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(tag: i8, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }
}

/// Decode a frame header. Any bit pattern is accepted.
///
/// ```text
/// ┌───────────────┬──────────┐
/// │ Length (2B BE)│ Tag (1B) │
/// └───────────────┴──────────┘
/// ```
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> Header {
    Header {
        length: u16::from_be_bytes([bytes[0], bytes[1]]),
        tag: bytes[2] as i8,
    }
}

/// Encode a frame header.
pub fn encode_header(header: &Header, dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE);
    dst.put_u16(header.length);
    dst.put_i8(header.tag);
}

/// Encode a header and payload into the wire format.
pub fn encode_frame(tag: i8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = Header::for_payload(tag, payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    encode_header(&header, dst);
    dst.put_slice(payload);
    Ok(())
}

/// The 2-byte all-zero keepalive.
pub fn encode_keepalive() -> [u8; 2] {
    KEEPALIVE
}
