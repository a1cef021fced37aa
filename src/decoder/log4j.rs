//! XML event decoder for the log4j/log4net wire family.
//!
//! Both loggers send a namespace-prefixed `<event>` fragment per message
//! without an enclosing document, so the fragment is wrapped in a synthetic
//! root that declares the Apache namespaces before parsing. Prefixes vary
//! across senders (`log4j:`, `log4net:`, none at all for legacy appenders);
//! matching is on local names throughout. The `timestamp` attribute is
//! milliseconds-since-epoch for log4j and an ISO-ish string for log4net;
//! both conventions are accepted.

use super::DecodeError;
use crate::domain::{LogEntry, META_EXCEPTION, META_HOST, timestamp};
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

fn xml_err<E: std::fmt::Display>(err: E) -> DecodeError {
    DecodeError::Xml(err.to_string())
}

/// Cheap root-tag check run before any XML machinery: the frame must open
/// with an `<event>`-style element (any namespace prefix).
fn looks_like_event(frame: &str) -> bool {
    let trimmed = frame.trim_start();
    let Some(rest) = trimmed.strip_prefix('<') else {
        return false;
    };
    let name: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect();
    let local = name.rsplit(':').next().unwrap_or("");
    local.eq_ignore_ascii_case("event")
}

enum Capture {
    None,
    Message,
    Exception,
}

pub(super) fn decode(frame: &str, received: DateTime<Utc>) -> Result<LogEntry, DecodeError> {
    if !looks_like_event(frame) {
        return Err(DecodeError::NotAnEvent);
    }

    // The wire fragment uses undeclared prefixes; give them a home
    let document = format!(
        "<root xmlns:log4j=\"http://jakarta.apache.org/log4j/\" \
         xmlns:log4net=\"http://logging.apache.org/log4net/\">{frame}</root>"
    );

    let mut reader = Reader::from_str(&document);
    reader.config_mut().trim_text(true);

    let mut entry = LogEntry {
        level: String::new(),
        timestamp: received,
        message: String::new(),
        source: None,
        system: String::new(),
        thread: String::new(),
        metadata: HashMap::new(),
    };
    let mut exception_text = String::new();
    let mut in_properties = false;
    let mut capture = Capture::None;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"event" => read_event_attributes(&element, &mut entry, received)?,
                b"message" => capture = Capture::Message,
                b"throwable" | b"exception" => capture = Capture::Exception,
                b"properties" => in_properties = true,
                b"data" if in_properties => read_data_property(&element, &mut entry)?,
                b"locationInfo" => read_location_info(&element, &mut entry)?,
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"event" => read_event_attributes(&element, &mut entry, received)?,
                b"data" if in_properties => read_data_property(&element, &mut entry)?,
                b"locationInfo" => read_location_info(&element, &mut entry)?,
                _ => {}
            },
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_err)?;
                match capture {
                    Capture::Message => entry.message.push_str(&text),
                    Capture::Exception => exception_text.push_str(&text),
                    Capture::None => {}
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                match capture {
                    Capture::Message => entry.message.push_str(&text),
                    Capture::Exception => exception_text.push_str(&text),
                    Capture::None => {}
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"message" | b"throwable" | b"exception" => capture = Capture::None,
                b"properties" => in_properties = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let exception_text = exception_text.trim();
    if !exception_text.is_empty() {
        entry.insert_meta(META_EXCEPTION, exception_text);
    }

    Ok(entry)
}

fn read_event_attributes(
    element: &BytesStart<'_>,
    entry: &mut LogEntry,
    received: DateTime<Utc>,
) -> Result<(), DecodeError> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?;
        match attr.key.local_name().as_ref() {
            b"level" => entry.level = value.into_owned(),
            b"logger" => entry.system = value.into_owned(),
            b"thread" => entry.thread = value.into_owned(),
            b"timestamp" => entry.timestamp = parse_event_timestamp(&value, received),
            _ => {}
        }
    }
    Ok(())
}

fn parse_event_timestamp(value: &str, received: DateTime<Utc>) -> DateTime<Utc> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        return timestamp::from_epoch_millis(millis).unwrap_or(received);
    }
    timestamp::parse_flexible(value).unwrap_or(received)
}

fn read_data_property(element: &BytesStart<'_>, entry: &mut LogEntry) -> Result<(), DecodeError> {
    let mut name = None;
    let mut value = None;
    for attr in element.attributes() {
        let attr = attr.map_err(xml_err)?;
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(attr.unescape_value().map_err(xml_err)?.into_owned()),
            b"value" => value = Some(attr.unescape_value().map_err(xml_err)?.into_owned()),
            _ => {}
        }
    }
    if let (Some(name), Some(value)) = (name, value) {
        store_property(entry, &name, value);
    }
    Ok(())
}

/// Host/machine-name properties are promoted to the dedicated `Host` key;
/// log4net spells them with a namespaced property name (`log4net:HostName`).
fn store_property(entry: &mut LogEntry, name: &str, value: String) {
    let local = name.rsplit(':').next().unwrap_or(name);
    if local.eq_ignore_ascii_case("hostname")
        || local.eq_ignore_ascii_case("machinename")
        || local.eq_ignore_ascii_case("host")
    {
        entry.insert_meta(META_HOST, value);
    } else {
        entry.insert_meta(name.to_string(), value);
    }
}

fn read_location_info(element: &BytesStart<'_>, entry: &mut LogEntry) -> Result<(), DecodeError> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?;
        match attr.key.local_name().as_ref() {
            b"class" => entry.insert_meta("Class", value.into_owned()),
            b"method" => entry.insert_meta("Method", value.into_owned()),
            b"file" => entry.insert_meta("File", value.into_owned()),
            b"line" => {
                let value = value.into_owned();
                match value.parse::<i64>() {
                    Ok(line) => entry.insert_meta("Line", line),
                    Err(_) => entry.insert_meta("Line", value),
                }
            }
            _ => {}
        }
    }
    Ok(())
}
