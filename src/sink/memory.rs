use super::{LogSink, SinkError};
use crate::domain::LogEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory sink with bounded retention. Once full, the oldest entries
/// are evicted; `total_received` keeps counting regardless, so tests and
/// status output can tell eviction from loss.
pub struct MemoryStore {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    total: AtomicU64,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            total: AtomicU64::new(0),
        }
    }

    /// Retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn total_received(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl LogSink for MemoryStore {
    fn add_batch(&self, batch: &[LogEntry]) -> Result<(), SinkError> {
        let mut entries = self.entries.lock();
        for entry in batch {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }
        self.total.fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            level: "INFO".to_string(),
            timestamp: Utc::now(),
            message: message.to_string(),
            source: None,
            system: "test".to_string(),
            thread: "1".to_string(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_retains_in_arrival_order() {
        let store = MemoryStore::new(10);
        store
            .add_batch(&[entry("a"), entry("b")])
            .unwrap();
        store.add_batch(&[entry("c")]).unwrap();

        let entries = store.snapshot();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["a", "b", "c"]);
        assert_eq!(store.total_received(), 3);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let store = MemoryStore::new(2);
        store
            .add_batch(&[entry("a"), entry("b"), entry("c")])
            .unwrap();

        let entries = store.snapshot();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["b", "c"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_received(), 3);
    }
}
