//! Sinks receive the decoded batches the purge loops produce.

pub mod console;
pub mod memory;

pub use console::ConsoleSink;
pub use memory::MemoryStore;

use crate::domain::LogEntry;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Sink rejected batch: {0}")]
    Rejected(String),
}

/// Destination for decoded log entries.
///
/// Called inline from every provider's purge loop, so implementations must
/// be thread-safe and should return quickly; a sink that blocks stalls its
/// provider's delivery. Batches are never empty and arrive in frame order.
/// A rejected batch is redelivered once on the next tick, then dropped.
pub trait LogSink: Send + Sync {
    fn add_batch(&self, batch: &[LogEntry]) -> Result<(), SinkError>;
}
