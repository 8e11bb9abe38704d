//! Frame tags understood by the client.
//!
//! The device may send other tags; those frames are skipped by length.

/// Error record with code, location and call stack.
pub const TAG_ERROR: i8 = 11;

/// Informational text record.
pub const TAG_INFO: i8 = 12;

/// Returns a human-readable name for a tag.
pub fn tag_name(tag: i8) -> &'static str {
    match tag {
        TAG_ERROR => "ERROR",
        TAG_INFO => "INFO",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(tag_name(TAG_ERROR), "ERROR");
        assert_eq!(tag_name(TAG_INFO), "INFO");
        assert_eq!(tag_name(-3), "UNKNOWN");
    }
}
