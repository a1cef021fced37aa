use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed value stored in a log entry's metadata map.
///
/// Metadata carries heterogeneous enrichment data: property strings, the
/// exception flag/text, host names, received timestamps, source-location
/// line numbers. A closed enum keeps a boolean flag distinguishable from the
/// text `"true"` when sinks serialize the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Flag(bool),
    Number(i64),
    Time(DateTime<Utc>),
    Text(String),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Time(value) => write!(f, "{}", value.to_rfc3339()),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
