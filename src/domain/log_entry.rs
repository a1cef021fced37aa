use super::meta_value::MetaValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key recording when the frame was decoded, as opposed to the
/// event timestamp the sender stamped. The gap between the two is the
/// transmission delay.
pub const META_RECEIVED_TIME: &str = "ReceivedTime";

/// Metadata key holding either explicit exception text from the wire format
/// or a boolean flag set by the message-text heuristic.
pub const META_EXCEPTION: &str = "Exception";

/// Metadata key for the sending host, promoted out of generic properties.
pub const META_HOST: &str = "Host";

/// A decoded log event in its canonical form.
///
/// Every wire decoder produces this shape regardless of transport or
/// protocol; batching, sinks and the store only ever see `LogEntry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity classification ("ERROR", "WARN", "INFO", ...). Free text;
    /// decoders pass through whatever vocabulary the sender used.
    pub level: String,
    /// When the event happened according to the sender. Falls back to
    /// receipt time when the wire timestamp is missing or unparsable.
    pub timestamp: DateTime<Utc>,
    /// The message body. Never absent after a successful decode; an empty
    /// string is allowed.
    pub message: String,
    /// Originating logger/component, when the wire format carries one.
    pub source: Option<String>,
    /// System/category dimension, typically the logger name.
    pub system: String,
    /// Thread identifier. Kept as a string because formats disagree on
    /// numeric vs symbolic thread names.
    pub thread: String,
    /// Open key-value bag for everything outside the fixed schema.
    pub metadata: HashMap<String, MetaValue>,
}

impl LogEntry {
    /// Inserts a metadata value, keeping the newer value on key collision.
    /// Collisions are unusual (an enrichment step clashing with a wire
    /// property) and get a warning so they are observable.
    pub fn insert_meta(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        let key = key.into();
        if let Some(previous) = self.metadata.insert(key.clone(), value.into()) {
            tracing::warn!("Metadata key '{key}' overwritten (previous value: {previous})");
        }
    }

    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// True when the exception key is present, whether as explicit text or
    /// as the heuristic flag.
    pub fn has_exception(&self) -> bool {
        self.metadata.contains_key(META_EXCEPTION)
    }
}
