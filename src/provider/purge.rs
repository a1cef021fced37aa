//! Purge loop shared by every provider: sleep one interval, drain the
//! pending queue, decode, and hand the batch to the sink.

use crate::buffer::PendingQueue;
use crate::decoder::{DecodeError, Decoder};
use crate::domain::LogEntry;
use crate::sink::LogSink;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) struct PurgeLoop {
    queue: Arc<PendingQueue>,
    decoder: Decoder,
    sink: Arc<dyn LogSink>,
    interval: Duration,
    token: CancellationToken,
    label: String,
    /// Batch the sink rejected last tick. Redelivered once, then dropped.
    held_back: Option<Vec<LogEntry>>,
}

impl PurgeLoop {
    pub(crate) fn new(
        queue: Arc<PendingQueue>,
        decoder: Decoder,
        sink: Arc<dyn LogSink>,
        interval: Duration,
        token: CancellationToken,
        label: String,
    ) -> Self {
        Self {
            queue,
            decoder,
            sink,
            interval,
            token,
            label,
            held_back: None,
        }
    }

    /// Runs until the cancellation token fires. Nothing is delivered after
    /// cancellation is observed; frames still queued at that point are
    /// discarded with the provider.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                () = self.token.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
            self.tick();
        }
        tracing::debug!("Purge loop for {} stopped", self.label);
    }

    fn tick(&mut self) {
        if let Some(held) = self.held_back.take() {
            if let Err(e) = self.sink.add_batch(&held) {
                tracing::warn!(
                    "Dropping batch of {} entries for {} after repeated sink failure: {e}",
                    held.len(),
                    self.label
                );
            }
        }

        let frames = self.queue.drain_all();
        if frames.is_empty() {
            return;
        }

        let batch: Vec<LogEntry> = frames
            .iter()
            .filter_map(|frame| match self.decoder.decode(frame) {
                Ok(entry) => Some(entry),
                Err(DecodeError::UnmatchedLine) => None,
                Err(e) => {
                    tracing::debug!("Dropping undecodable frame from {}: {e}", self.label);
                    None
                }
            })
            .collect();
        if batch.is_empty() {
            return;
        }

        if let Err(e) = self.sink.add_batch(&batch) {
            tracing::warn!(
                "Sink rejected batch of {} entries from {}: {e}, holding for one retry",
                batch.len(),
                self.label
            );
            self.held_back = Some(batch);
        }
    }
}
