//! Property tests for the record codec: every valid record survives
//! encode/decode unchanged, and arbitrary payloads never panic the decoders.

use bytes::BytesMut;
use netconsole_frame::{
    decode_error, decode_header, decode_info, encode_error, encode_info, ErrorRecord, FrameError,
    InfoRecord, Record, HEADER_SIZE, TAG_ERROR, TAG_INFO,
};
use proptest::prelude::*;

fn finite_f32() -> impl Strategy<Value = f32> {
    any::<f32>().prop_filter("finite timestamp", |ts| ts.is_finite())
}

/// Short arbitrary text, or ASCII up to the 65535-byte string limit.
fn wire_string() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "\\PC{0,64}",
        1 => (0usize..=u16::MAX as usize).prop_map(|len| "x".repeat(len)),
    ]
}

fn info_record() -> impl Strategy<Value = InfoRecord> {
    (finite_f32(), any::<u16>(), wire_string()).prop_map(|(timestamp, sequence, message)| {
        InfoRecord {
            timestamp,
            sequence,
            message,
        }
    })
}

fn error_record() -> impl Strategy<Value = ErrorRecord> {
    (
        (finite_f32(), any::<u16>(), any::<u16>(), any::<i32>(), any::<u8>()),
        (wire_string(), wire_string(), wire_string()),
    )
        .prop_map(
            |((timestamp, sequence, occurrence_count, error_code, flags), (details, location, call_stack))| {
                ErrorRecord {
                    timestamp,
                    sequence,
                    occurrence_count,
                    error_code,
                    flags,
                    details,
                    location,
                    call_stack,
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn info_survives_roundtrip(record in info_record()) {
        let mut buf = BytesMut::new();
        encode_info(&record, &mut buf).unwrap();
        prop_assert_eq!(decode_info(&buf).unwrap(), record);
    }

    #[test]
    fn error_survives_roundtrip(record in error_record()) {
        let mut buf = BytesMut::new();
        encode_error(&record, &mut buf).unwrap();
        prop_assert_eq!(decode_error(&buf).unwrap(), record);
    }

    #[test]
    fn error_frame_header_counts_tag_and_payload(record in error_record()) {
        let record = Record::Error(record);
        let mut buf = BytesMut::new();
        // Three long strings can exceed one frame; those must be refused.
        match record.encode(&mut buf) {
            Ok(()) => {
                let header = decode_header(&buf[..HEADER_SIZE].try_into().unwrap());
                prop_assert_eq!(header.tag, TAG_ERROR);
                prop_assert_eq!(header.payload_len(), Some(buf.len() - HEADER_SIZE));
                prop_assert_eq!(
                    Record::decode(header.tag, &buf[HEADER_SIZE..]).unwrap(),
                    Some(record)
                );
            }
            Err(err) => prop_assert!(matches!(err, FrameError::PayloadTooLarge { .. }), "unexpected error: {err:?}"),
        }
    }

    #[test]
    fn arbitrary_info_payload_decodes_or_is_truncated(
        payload in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        match decode_info(&payload) {
            Ok(record) => prop_assert!(payload.len() >= 6, "decoded {record:?}"),
            Err(err) => prop_assert!(matches!(err, FrameError::Truncated { .. }), "unexpected error: {err:?}"),
        }
    }

    #[test]
    fn arbitrary_error_payload_decodes_or_is_truncated(
        payload in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        match decode_error(&payload) {
            Ok(_) => prop_assert!(payload.len() >= 13 + 3 * 2),
            Err(err) => prop_assert!(matches!(err, FrameError::Truncated { .. }), "unexpected error: {err:?}"),
        }
    }

    #[test]
    fn unknown_tags_are_skipped(
        tag in any::<i8>().prop_filter("unknown tag", |t| *t != TAG_INFO && *t != TAG_ERROR),
        payload in prop::collection::vec(any::<u8>(), 0..64)
    ) {
        prop_assert!(Record::decode(tag, &payload).unwrap().is_none());
    }
}
