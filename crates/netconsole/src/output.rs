use std::io::Write;

use clap::ValueEnum;
use netconsole_frame::Record;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    /// `[ts] message` console lines.
    Text,
    /// One JSON object per record.
    Json,
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    kind: &'static str,
    timestamp: f32,
    sequence: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    occurrence_count: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_stack: Option<&'a str>,
    text: String,
}

impl<'a> From<&'a Record> for RecordOutput<'a> {
    fn from(record: &'a Record) -> Self {
        let text = record.to_string();
        match record {
            Record::Info(info) => Self {
                kind: "info",
                timestamp: info.timestamp,
                sequence: info.sequence,
                message: Some(&info.message),
                occurrence_count: None,
                error_code: None,
                flags: None,
                details: None,
                location: None,
                call_stack: None,
                text,
            },
            Record::Error(error) => Self {
                kind: "error",
                timestamp: error.timestamp,
                sequence: error.sequence,
                message: None,
                occurrence_count: Some(error.occurrence_count),
                error_code: Some(error.error_code),
                flags: Some(error.flags),
                details: Some(&error.details),
                location: Some(&error.location),
                call_stack: Some(&error.call_stack),
                text,
            },
        }
    }
}

pub fn render_record(record: &Record, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => record.to_string(),
        OutputFormat::Json => serde_json::to_string(&RecordOutput::from(record))
            .unwrap_or_else(|_| "{}".to_string()),
    }
}

/// Print one record per line on stdout. Write errors (closed pipe) are
/// ignored so the reader thread never panics.
pub fn print_record(record: &Record, format: OutputFormat) {
    let line = render_record(record, format);
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use netconsole_frame::{ErrorRecord, InfoRecord};

    use super::*;

    #[test]
    fn text_matches_console_format() {
        let record = Record::Info(InfoRecord {
            timestamp: 4.0,
            sequence: 3,
            message: "another message".to_string(),
        });
        assert_eq!(
            render_record(&record, OutputFormat::Text),
            "[4.00] another message"
        );
    }

    #[test]
    fn json_info_omits_error_fields() {
        let record = Record::Info(InfoRecord {
            timestamp: 1.5,
            sequence: 9,
            message: "hi".to_string(),
        });
        let value: serde_json::Value =
            serde_json::from_str(&render_record(&record, OutputFormat::Json)).unwrap();
        assert_eq!(value["kind"], "info");
        assert_eq!(value["sequence"], 9);
        assert_eq!(value["message"], "hi");
        assert_eq!(value["text"], "[1.50] hi");
        assert!(value.get("error_code").is_none());
    }

    #[test]
    fn json_error_carries_all_fields() {
        let record = Record::Error(ErrorRecord {
            timestamp: 2.0,
            sequence: 1,
            occurrence_count: 1,
            error_code: -2,
            flags: 1,
            details: "details".to_string(),
            location: "location".to_string(),
            call_stack: "callstack".to_string(),
        });
        let value: serde_json::Value =
            serde_json::from_str(&render_record(&record, OutputFormat::Json)).unwrap();
        assert_eq!(value["kind"], "error");
        assert_eq!(value["error_code"], -2);
        assert_eq!(value["call_stack"], "callstack");
        assert!(value.get("message").is_none());
    }
}
