//! File-tail provider. Polls a log file on an interval and decodes each
//! appended line with the configured regex pattern.

use super::purge::PurgeLoop;
use super::settings::{FileTailSettings, ProviderSettings};
use super::{ProviderError, ProviderState, ProviderStatus};
use crate::buffer::PendingQueue;
use crate::decoder::{Decoder, PatternDecoder};
use crate::frame::FileTailReader;
use crate::sink::LogSink;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct FileTailProvider {
    settings: FileTailSettings,
    decoder: Decoder,
    sink: Arc<dyn LogSink>,
    state: ProviderState,
    token: CancellationToken,
    receive_task: Option<JoinHandle<()>>,
    purge_task: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl FileTailProvider {
    /// Compiles the line pattern eagerly, so a bad regex fails construction
    /// instead of surfacing after the provider is running.
    pub fn new(
        settings: ProviderSettings,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, ProviderError> {
        let ProviderSettings::FileTail(settings) = settings else {
            return Err(ProviderError::SettingsMismatch(
                "file tail provider requires file tail settings".to_string(),
            ));
        };
        settings.validate()?;
        let pattern = PatternDecoder::new(&settings.pattern)
            .map_err(|e| ProviderError::InvalidSettings(e.to_string()))?;
        Ok(Self {
            settings,
            decoder: Decoder::RegexText(pattern),
            sink,
            state: ProviderState::Idle,
            token: CancellationToken::new(),
            receive_task: None,
            purge_task: None,
            last_error: Arc::new(Mutex::new(None)),
        })
    }

    /// The file does not need to exist yet; polling starts and reports
    /// misses until it appears.
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        if self.state == ProviderState::Running {
            tracing::warn!("Provider {} is already running, ignoring start", self.name());
            return Ok(());
        }
        tracing::info!(
            "File tail provider watching {} (load_existing={})",
            self.settings.path.display(),
            self.settings.load_existing
        );

        let queue = Arc::new(PendingQueue::new());
        let token = CancellationToken::new();
        *self.last_error.lock() = None;

        self.receive_task = Some(tokio::spawn(tail_loop(
            self.settings.clone(),
            queue.clone(),
            token.clone(),
            self.last_error.clone(),
        )));
        self.purge_task = Some(tokio::spawn(
            PurgeLoop::new(
                queue,
                self.decoder.clone(),
                self.sink.clone(),
                self.settings.purge_interval,
                token.clone(),
                self.name(),
            )
            .run(),
        ));
        self.token = token;
        self.state = ProviderState::Running;
        Ok(())
    }

    pub fn close(&mut self) {
        if self.state == ProviderState::Running {
            tracing::info!("Closing provider {}", self.name());
        }
        self.token.cancel();
        self.state = ProviderState::Closed;
    }

    /// There is no suspend state; pausing closes the provider. A later
    /// `start` re-reads the file position from scratch.
    pub fn pause(&mut self) {
        self.close();
    }

    pub fn is_active(&self) -> bool {
        self.receive_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn status(&self) -> ProviderStatus {
        ProviderStatus {
            state: self.state,
            is_active: self.is_active(),
            last_error: self.last_error.lock().clone(),
        }
    }

    pub fn name(&self) -> String {
        format!("file:{}", self.settings.path.display())
    }
}

impl std::fmt::Debug for FileTailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTailProvider")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for FileTailProvider {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn tail_loop(
    settings: FileTailSettings,
    queue: Arc<PendingQueue>,
    token: CancellationToken,
    last_error: Arc<Mutex<Option<String>>>,
) {
    let mut reader = FileTailReader::new(&settings.path, settings.load_existing);
    // First poll runs immediately so the start position is pinned (and
    // existing content read, when asked) before any interval elapses.
    poll_once(&mut reader, &queue, &last_error).await;
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            () = tokio::time::sleep(settings.poll_interval) => {}
        }
        poll_once(&mut reader, &queue, &last_error).await;
    }
    tracing::debug!("File tail loop for {} stopped", settings.path.display());
}

async fn poll_once(
    reader: &mut FileTailReader,
    queue: &PendingQueue,
    last_error: &Mutex<Option<String>>,
) {
    match reader.poll().await {
        Ok(lines) => {
            for line in lines {
                if !line.trim().is_empty() {
                    queue.enqueue(line);
                }
            }
        }
        Err(e) => {
            // A missing or unreadable file is retried on the next tick.
            tracing::debug!(
                "Poll of {} failed: {e}, retrying next tick",
                reader.path().display()
            );
            *last_error.lock() = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::settings::{NetworkSettings, WireFormat};
    use crate::sink::MemoryStore;

    #[test]
    fn test_rejects_network_settings() {
        let settings = ProviderSettings::Network(NetworkSettings::new(WireFormat::Log4jXml));
        let err = FileTailProvider::new(settings, Arc::new(MemoryStore::new(10))).unwrap_err();
        assert!(matches!(err, ProviderError::SettingsMismatch(_)));
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let settings = ProviderSettings::FileTail(FileTailSettings::new(
            "/var/log/app.log",
            r"(?P<description>unclosed",
        ));
        let err = FileTailProvider::new(settings, Arc::new(MemoryStore::new(10))).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSettings(_)));
    }

    #[tokio::test]
    async fn test_missing_file_recorded_but_provider_stays_active() {
        let mut settings = FileTailSettings::new(
            "/nonexistent/dir/app.log",
            r"(?P<description>.*)",
        );
        settings.poll_interval = std::time::Duration::from_millis(10);
        settings.purge_interval = std::time::Duration::from_millis(10);
        let mut provider = FileTailProvider::new(
            ProviderSettings::FileTail(settings),
            Arc::new(MemoryStore::new(10)),
        )
        .unwrap();

        provider.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert!(provider.is_active());
        assert!(provider.status().last_error.is_some());
        provider.close();
    }
}
