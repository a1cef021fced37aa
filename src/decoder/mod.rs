//! Wire decoders: one pure mapping per protocol from a raw frame to the
//! canonical `LogEntry`.
//!
//! The decoder kind is a closed enum; providers pick one at construction and
//! the purge loop calls the single `decode` entry point per frame. Shared
//! enrichment (received-time stamp, exception heuristic) happens here so all
//! formats behave identically.

mod envelope;
mod log4j;
mod pattern;

pub use pattern::PatternDecoder;

use crate::domain::{LogEntry, META_EXCEPTION, META_RECEIVED_TIME, MetaValue};
use chrono::Utc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("JSON parse error: {0}")]
    Json(#[from] simd_json::Error),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Message is not an event fragment")]
    NotAnEvent,
    #[error("Line does not match the configured pattern")]
    UnmatchedLine,
}

/// Closed set of wire formats the pipeline understands.
///
/// `Log4jXml` and `Log4netXml` share one XML routine (the fragments differ
/// only in namespace prefix and timestamp convention, both of which the
/// routine accepts); `RegexText` carries its compiled pattern.
#[derive(Debug, Clone)]
pub enum Decoder {
    Log4jXml,
    Log4netXml,
    JsonEnvelope,
    RegexText(PatternDecoder),
}

impl Decoder {
    /// Decodes one frame. On success the entry always carries a
    /// `ReceivedTime` metadata value and the exception heuristic has been
    /// applied.
    pub fn decode(&self, frame: &str) -> Result<LogEntry, DecodeError> {
        let received = Utc::now();
        let mut entry = match self {
            Self::Log4jXml | Self::Log4netXml => log4j::decode(frame, received),
            Self::JsonEnvelope => envelope::decode(frame, received),
            Self::RegexText(decoder) => decoder.decode(frame, received),
        }?;

        entry.insert_meta(META_RECEIVED_TIME, received);
        apply_exception_heuristic(&mut entry);
        Ok(entry)
    }

    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Log4jXml => "log4j-xml",
            Self::Log4netXml => "log4net-xml",
            Self::JsonEnvelope => "json-envelope",
            Self::RegexText(_) => "regex-text",
        }
    }
}

/// Flags entries whose message mentions an exception when the wire format
/// did not carry an explicit exception element. Heuristic only: a message
/// discussing exceptions trips it too.
fn apply_exception_heuristic(entry: &mut LogEntry) {
    if entry.has_exception() {
        return;
    }
    if entry.message.to_uppercase().contains("EXCEPTION") {
        entry
            .metadata
            .insert(META_EXCEPTION.to_string(), MetaValue::Flag(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_received_time_always_recorded() {
        let frame = r#"<event logger="Foo" level="INFO" thread="1" timestamp="0"><message>hi</message></event>"#;
        let entry = Decoder::Log4jXml.decode(frame).unwrap();
        assert!(entry.meta(META_RECEIVED_TIME).is_some());
    }

    #[test]
    fn test_exception_heuristic_any_casing() {
        let frame = r#"<event logger="Foo" level="ERROR" thread="1" timestamp="0"><message>caught an ExCePtIoN here</message></event>"#;
        let entry = Decoder::Log4jXml.decode(frame).unwrap();
        assert_eq!(entry.meta(META_EXCEPTION), Some(&MetaValue::Flag(true)));
    }

    #[test]
    fn test_no_heuristic_without_substring() {
        let frame = r#"<event logger="Foo" level="INFO" thread="1" timestamp="0"><message>all quiet</message></event>"#;
        let entry = Decoder::Log4jXml.decode(frame).unwrap();
        assert!(!entry.has_exception());
    }

    #[test]
    fn test_explicit_exception_text_wins_over_flag() {
        let frame = r#"<event logger="Foo" level="ERROR" thread="1" timestamp="0"><message>exception ahead</message><throwable>java.io.IOException: boom</throwable></event>"#;
        let entry = Decoder::Log4jXml.decode(frame).unwrap();
        assert_eq!(
            entry.meta(META_EXCEPTION),
            Some(&MetaValue::Text("java.io.IOException: boom".to_string()))
        );
    }

    #[test]
    fn test_decoder_names() {
        assert_eq!(Decoder::Log4jXml.name(), "log4j-xml");
        assert_eq!(Decoder::JsonEnvelope.name(), "json-envelope");
    }
}
