use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::encode_frame;
use crate::error::{FrameError, Result};
use crate::tag::{TAG_ERROR, TAG_INFO};

/// Fixed info fields: timestamp (4) + sequence (2).
pub const INFO_FIXED_SIZE: usize = 6;

/// Fixed error fields: timestamp (4) + sequence (2) + occurrences (2) +
/// error code (4) + flags (1).
pub const ERROR_FIXED_SIZE: usize = 13;

const STR_LEN_SIZE: usize = 2;

/// Informational message from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoRecord {
    /// Device uptime in seconds.
    pub timestamp: f32,
    pub sequence: u16,
    pub message: String,
}

/// Error or warning reported by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    /// Device uptime in seconds.
    pub timestamp: f32,
    pub sequence: u16,
    pub occurrence_count: u16,
    pub error_code: i32,
    pub flags: u8,
    pub details: String,
    pub location: String,
    pub call_stack: String,
}

/// A decoded telemetry record.
///
/// `Display` renders the console line: `[ts] message` for info records and
/// `[ts] code details location call_stack` for errors, timestamps with two
/// decimals.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Info(InfoRecord),
    Error(ErrorRecord),
}

impl Record {
    /// Decode a payload by tag. Unknown tags yield `Ok(None)`.
    pub fn decode(tag: i8, payload: &[u8]) -> Result<Option<Self>> {
        match tag {
            TAG_INFO => decode_info(payload).map(|r| Some(Self::Info(r))),
            TAG_ERROR => decode_error(payload).map(|r| Some(Self::Error(r))),
            _ => Ok(None),
        }
    }

    /// Encode this record as a complete frame (header + payload).
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let mut payload = BytesMut::new();
        match self {
            Self::Info(record) => encode_info(record, &mut payload)?,
            Self::Error(record) => encode_error(record, &mut payload)?,
        }
        encode_frame(self.tag(), &payload, dst)
    }

    pub fn tag(&self) -> i8 {
        match self {
            Self::Info(_) => TAG_INFO,
            Self::Error(_) => TAG_ERROR,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info(record) => fmt::Display::fmt(record, f),
            Self::Error(record) => fmt::Display::fmt(record, f),
        }
    }
}

impl fmt::Display for InfoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}] {}", self.timestamp, self.message)
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}] {} {} {} {}",
            self.timestamp, self.error_code, self.details, self.location, self.call_stack
        )
    }
}

/// Decode an info payload. The message is everything after the fixed fields,
/// with invalid UTF-8 replaced.
pub fn decode_info(payload: &[u8]) -> Result<InfoRecord> {
    let mut buf = payload;
    ensure(buf, INFO_FIXED_SIZE)?;

    let timestamp = buf.get_f32();
    let sequence = buf.get_u16();
    let message = String::from_utf8_lossy(buf).into_owned();

    Ok(InfoRecord {
        timestamp,
        sequence,
        message,
    })
}

/// Decode an error payload: fixed fields, then `details`, `location` and
/// `call_stack` as length-prefixed strings.
///
/// A string whose declared length runs past the payload is
/// [`FrameError::Truncated`], never a shortened string.
pub fn decode_error(payload: &[u8]) -> Result<ErrorRecord> {
    let mut buf = payload;
    ensure(buf, ERROR_FIXED_SIZE)?;

    let timestamp = buf.get_f32();
    let sequence = buf.get_u16();
    let occurrence_count = buf.get_u16();
    let error_code = buf.get_i32();
    let flags = buf.get_u8();
    let details = get_str(&mut buf)?;
    let location = get_str(&mut buf)?;
    let call_stack = get_str(&mut buf)?;

    if buf.has_remaining() {
        tracing::trace!(extra = buf.remaining(), "ignoring bytes after error record");
    }

    Ok(ErrorRecord {
        timestamp,
        sequence,
        occurrence_count,
        error_code,
        flags,
        details,
        location,
        call_stack,
    })
}

/// Encode an info payload (no header).
pub fn encode_info(record: &InfoRecord, dst: &mut BytesMut) -> Result<()> {
    dst.reserve(INFO_FIXED_SIZE + record.message.len());
    dst.put_f32(record.timestamp);
    dst.put_u16(record.sequence);
    dst.put_slice(record.message.as_bytes());
    Ok(())
}

/// Encode an error payload (no header).
pub fn encode_error(record: &ErrorRecord, dst: &mut BytesMut) -> Result<()> {
    for s in [&record.details, &record.location, &record.call_stack] {
        check_str_len(s)?;
    }

    dst.reserve(
        ERROR_FIXED_SIZE
            + 3 * STR_LEN_SIZE
            + record.details.len()
            + record.location.len()
            + record.call_stack.len(),
    );
    dst.put_f32(record.timestamp);
    dst.put_u16(record.sequence);
    dst.put_u16(record.occurrence_count);
    dst.put_i32(record.error_code);
    dst.put_u8(record.flags);
    put_str(&record.details, dst);
    put_str(&record.location, dst);
    put_str(&record.call_stack, dst);
    Ok(())
}

fn ensure(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(FrameError::Truncated {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn get_str(buf: &mut &[u8]) -> Result<String> {
    ensure(*buf, STR_LEN_SIZE)?;
    let len = buf.get_u16() as usize;
    ensure(*buf, len)?;

    let s = String::from_utf8_lossy(&buf[..len]).into_owned();
    buf.advance(len);
    Ok(s)
}

fn check_str_len(s: &str) -> Result<()> {
    if s.len() > u16::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: s.len(),
            max: u16::MAX as usize,
        });
    }
    Ok(())
}

fn put_str(s: &str, dst: &mut BytesMut) {
    dst.put_u16(s.len() as u16);
    dst.put_slice(s.as_bytes());
}
