use super::{LogSink, SinkError};
use crate::domain::LogEntry;
use std::io::Write;

/// Writes each entry as one JSON line on stdout. The stdout lock is held
/// for the whole batch so entries from concurrent providers never
/// interleave mid-line.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for ConsoleSink {
    fn add_batch(&self, batch: &[LogEntry]) -> Result<(), SinkError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for entry in batch {
            serde_json::to_writer(&mut out, entry)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}
