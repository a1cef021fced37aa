//! Domain layer for argus-log-ingest.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry`: the normalized record every decoder produces
//! - `MetaValue`: typed values for the open metadata map
//! - `IngestError`: top-level error type
//! - `timestamp`: shared wire-timestamp parsing helpers

pub mod error;
pub mod log_entry;
pub mod meta_value;
pub mod timestamp;

pub use error::IngestError;
pub use log_entry::{LogEntry, META_EXCEPTION, META_HOST, META_RECEIVED_TIME};
pub use meta_value::MetaValue;
