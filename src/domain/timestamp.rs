//! Wire-timestamp parsing shared by all decoders.
//!
//! Formats disagree: log4j sends milliseconds since the epoch, log4net an
//! ISO-ish string, the JSON envelope an ISO datetime, and file regexes
//! capture whatever the application wrote. Parsing is best-effort; a miss is
//! a per-field fallback to receipt time, never a decode error.

use chrono::{DateTime, NaiveDateTime, Utc};

const NAIVE_LAYOUTS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
];

/// Parses a textual timestamp, trying RFC 3339 first and then a short list
/// of common layouts. Returns `None` when nothing matches.
pub fn parse_flexible(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Senders frequently drop the zone designator; retry as UTC
    if !text.ends_with('Z') && !text.ends_with('z') {
        let with_zone = format!("{text}Z");
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&with_zone) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Converts a milliseconds-since-epoch value, the log4j wire convention.
/// Returns `None` for values outside the representable range.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
