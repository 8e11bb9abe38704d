/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload ended before a fixed field or declared string length.
    #[error("truncated frame (needed {needed} bytes, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The header declared a length of zero, which cannot cover the tag byte.
    #[error("frame header declares zero length")]
    ZeroLength,

    /// A payload or string does not fit its 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream accepted no more bytes mid-frame.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
