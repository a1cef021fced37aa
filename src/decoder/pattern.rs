//! Regex decoder for tailed text files.
//!
//! The pattern is user-supplied with named capture groups drawn from a
//! fixed, case-insensitive vocabulary: `description`, `datetime`, `type`,
//! `logger`. Group presence is probed once at construction; decode only
//! reads groups that exist, under the exact spelling the pattern used.

use super::DecodeError;
use crate::domain::{LogEntry, timestamp};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct GroupCapabilities {
    // Each field stores the group name as spelled in the pattern, so
    // lookups at decode time hit the compiled group exactly.
    description: Option<String>,
    datetime: Option<String>,
    level: Option<String>,
    logger: Option<String>,
}

/// Compiled line decoder for the file-tail provider.
#[derive(Debug, Clone)]
pub struct PatternDecoder {
    regex: Regex,
    groups: GroupCapabilities,
}

impl PatternDecoder {
    /// Compiles the pattern and probes which vocabulary groups it defines.
    /// An invalid pattern is a construction failure, surfaced before any
    /// provider is started.
    pub fn new(pattern: &str) -> Result<Self, DecodeError> {
        let regex = Regex::new(pattern)?;

        let mut groups = GroupCapabilities::default();
        for name in regex.capture_names().flatten() {
            if name.eq_ignore_ascii_case("description") {
                groups.description = Some(name.to_string());
            } else if name.eq_ignore_ascii_case("datetime") {
                groups.datetime = Some(name.to_string());
            } else if name.eq_ignore_ascii_case("type") {
                groups.level = Some(name.to_string());
            } else if name.eq_ignore_ascii_case("logger") {
                groups.logger = Some(name.to_string());
            }
        }

        Ok(Self { regex, groups })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn has_description(&self) -> bool {
        self.groups.description.is_some()
    }

    pub fn has_datetime(&self) -> bool {
        self.groups.datetime.is_some()
    }

    pub fn has_level(&self) -> bool {
        self.groups.level.is_some()
    }

    pub fn has_logger(&self) -> bool {
        self.groups.logger.is_some()
    }

    pub(super) fn decode(
        &self,
        line: &str,
        received: DateTime<Utc>,
    ) -> Result<LogEntry, DecodeError> {
        let Some(captures) = self.regex.captures(line) else {
            tracing::trace!("Line does not match pattern: {line}");
            return Err(DecodeError::UnmatchedLine);
        };

        let group = |name: &Option<String>| {
            name.as_deref()
                .and_then(|name| captures.name(name))
                .map(|found| found.as_str())
        };

        let logger = group(&self.groups.logger);

        Ok(LogEntry {
            level: group(&self.groups.level).unwrap_or("").to_string(),
            timestamp: group(&self.groups.datetime)
                .and_then(timestamp::parse_flexible)
                .unwrap_or(received),
            message: group(&self.groups.description).unwrap_or("").to_string(),
            source: logger.map(str::to_string),
            system: logger.unwrap_or("").to_string(),
            thread: String::new(),
            metadata: HashMap::new(),
        })
    }
}
