//! Frame codec for the netconsole telemetry protocol.
//!
//! Every frame is a 3-byte header followed by a payload:
//! - a 2-byte big-endian length counting the tag byte plus the payload
//! - a 1-byte signed tag selecting the record type
//!
//! Decoding is pure: functions take byte slices and return records, with no
//! I/O and no state. The encoders exist for reference servers and fixtures
//! and invert the decoders byte for byte.

pub mod codec;
pub mod error;
pub mod record;
pub mod tag;
pub mod writer;

pub use codec::{
    decode_header, encode_frame, encode_header, encode_keepalive, Frame, Header, HEADER_SIZE,
    KEEPALIVE, MAX_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use record::{
    decode_error, decode_info, encode_error, encode_info, ErrorRecord, InfoRecord, Record,
    ERROR_FIXED_SIZE, INFO_FIXED_SIZE,
};
pub use tag::{tag_name, TAG_ERROR, TAG_INFO};
pub use writer::FrameWriter;
