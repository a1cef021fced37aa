//! JSON envelope decoder for the build-tool listener protocol.
//!
//! The payload is a JSON object with exactly one top-level property; the
//! property name is the event-type tag and its value carries the event
//! fields: `{"ErrorRaised": {"Message": ..., "Timestamp": ..., "ThreadId":
//! ..., "SenderName": ...}}`.

use super::DecodeError;
use crate::domain::{LogEntry, timestamp};
use chrono::{DateTime, Utc};
use simd_json::OwnedValue;
use simd_json::prelude::{ValueAsObject, ValueAsScalar};
use std::collections::HashMap;

/// Maps the envelope tag to the canonical severity vocabulary. Unknown tags
/// (status messages, build lifecycle events) are informational.
fn level_for_tag(tag: &str) -> &'static str {
    match tag {
        "ErrorRaised" => "ERROR",
        "WarningRaised" => "WARN",
        _ => "INFO",
    }
}

pub(super) fn decode(frame: &str, received: DateTime<Utc>) -> Result<LogEntry, DecodeError> {
    // SIMD parsing wants a mutable scratch copy
    let mut data = frame.as_bytes().to_vec();
    let json: OwnedValue = simd_json::from_slice(&mut data)?;

    let envelope = json
        .as_object()
        .ok_or_else(|| DecodeError::InvalidEnvelope("payload is not a JSON object".to_string()))?;

    if envelope.len() != 1 {
        return Err(DecodeError::InvalidEnvelope(format!(
            "expected exactly one event property, found {}",
            envelope.len()
        )));
    }

    let (tag, body) = envelope
        .iter()
        .next()
        .ok_or_else(|| DecodeError::InvalidEnvelope("empty envelope".to_string()))?;

    let body = body.as_object().ok_or_else(|| {
        DecodeError::InvalidEnvelope(format!("event '{tag}' payload is not an object"))
    })?;

    let message = body
        .get("Message")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DecodeError::MissingField("Message".to_string()))?
        .to_string();

    let timestamp_text = body
        .get("Timestamp")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DecodeError::MissingField("Timestamp".to_string()))?;

    let thread_id = body
        .get("ThreadId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| DecodeError::MissingField("ThreadId".to_string()))?;

    let sender = body
        .get("SenderName")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DecodeError::MissingField("SenderName".to_string()))?
        .to_string();

    let mut entry = LogEntry {
        level: level_for_tag(tag).to_string(),
        timestamp: timestamp::parse_flexible(timestamp_text).unwrap_or(received),
        message,
        source: Some(sender.clone()),
        system: sender,
        thread: thread_id.to_string(),
        metadata: HashMap::new(),
    };
    entry.insert_meta("Event", tag.to_string());

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetaValue;
    use chrono::TimeZone;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_error_raised() {
        let frame = r#"{"ErrorRaised":{"Message":"build failed","Timestamp":"2024-01-01T12:00:00Z","ThreadId":7,"SenderName":"msbuild"}}"#;
        let entry = decode(frame, received()).unwrap();

        assert_eq!(entry.level, "ERROR");
        assert_eq!(entry.message, "build failed");
        assert_eq!(entry.thread, "7");
        assert_eq!(entry.source.as_deref(), Some("msbuild"));
        assert_eq!(entry.system, "msbuild");
        assert_eq!(
            entry.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            entry.meta("Event"),
            Some(&MetaValue::Text("ErrorRaised".to_string()))
        );
    }

    #[test]
    fn test_decode_warning_and_unknown_tags() {
        let warning = r#"{"WarningRaised":{"Message":"m","Timestamp":"2024-01-01T12:00:00Z","ThreadId":1,"SenderName":"s"}}"#;
        assert_eq!(decode(warning, received()).unwrap().level, "WARN");

        let status = r#"{"StatusChanged":{"Message":"m","Timestamp":"2024-01-01T12:00:00Z","ThreadId":1,"SenderName":"s"}}"#;
        assert_eq!(decode(status, received()).unwrap().level, "INFO");
    }

    #[test]
    fn test_rejects_multiple_top_level_properties() {
        let frame = r#"{"A":{"Message":"m","Timestamp":"t","ThreadId":1,"SenderName":"s"},"B":{}}"#;
        assert!(matches!(
            decode(frame, received()),
            Err(DecodeError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_rejects_missing_subfield() {
        let frame = r#"{"ErrorRaised":{"Timestamp":"2024-01-01T12:00:00Z","ThreadId":1,"SenderName":"s"}}"#;
        let result = decode(frame, received());
        assert!(matches!(result, Err(DecodeError::MissingField(field)) if field == "Message"));
    }

    #[test]
    fn test_rejects_non_object_payloads() {
        assert!(matches!(
            decode("[1,2,3]", received()),
            Err(DecodeError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            decode(r#"{"Tag":"not an object"}"#, received()),
            Err(DecodeError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            decode(r#"{"ErrorRaised":"#, received()),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_unparsable_timestamp_falls_back_to_receipt() {
        let frame = r#"{"ErrorRaised":{"Message":"m","Timestamp":"whenever","ThreadId":1,"SenderName":"s"}}"#;
        let entry = decode(frame, received()).unwrap();
        assert_eq!(entry.timestamp, received());
    }
}
