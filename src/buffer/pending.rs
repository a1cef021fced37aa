use parking_lot::Mutex;

/// FIFO hand-off between one provider's receive loop and its purge loop.
///
/// The surface is deliberately two operations: producers `enqueue`, the
/// consumer `drain_all`s. Each holds the internal lock for the whole
/// operation, never per element, so a drain is atomic with respect to
/// concurrent enqueues: no frame is observed twice and no frame written
/// during a drain is lost. The raw container is never exposed.
///
/// The backlog is unbounded in type but bounded in practice by the purge
/// cadence, which empties it every tick.
#[derive(Debug, Default)]
pub struct PendingQueue {
    frames: Mutex<Vec<String>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one raw frame in arrival order.
    pub fn enqueue(&self, frame: String) {
        self.frames.lock().push(frame);
    }

    /// Atomically takes the whole backlog, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<String> {
        std::mem::take(&mut *self.frames.lock())
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_drain_preserves_fifo_order() {
        let queue = PendingQueue::new();
        queue.enqueue("a".to_string());
        queue.enqueue("b".to_string());
        queue.enqueue("c".to_string());

        assert_eq!(queue.drain_all(), vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_on_empty_queue() {
        let queue = PendingQueue::new();
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;

        let queue = Arc::new(PendingQueue::new());
        let mut handles = Vec::new();

        for producer in 0..PRODUCERS {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                for sequence in 0..PER_PRODUCER {
                    queue.enqueue(format!("{producer}:{sequence}"));
                }
            }));
        }

        // Drain concurrently with the producers, like the purge loop does
        let mut drained = Vec::new();
        while drained.len() < PRODUCERS * PER_PRODUCER {
            drained.extend(queue.drain_all());
        }
        for handle in handles {
            handle.join().unwrap();
        }
        drained.extend(queue.drain_all());

        assert_eq!(drained.len(), PRODUCERS * PER_PRODUCER);

        // Per-producer order must survive interleaving
        for producer in 0..PRODUCERS {
            let prefix = format!("{producer}:");
            let sequences: Vec<usize> = drained
                .iter()
                .filter_map(|frame| frame.strip_prefix(&prefix))
                .map(|sequence| sequence.parse().unwrap())
                .collect();
            let mut sorted = sequences.clone();
            sorted.sort_unstable();
            assert_eq!(sequences, sorted);
        }
    }
}
