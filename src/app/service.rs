use super::Config;
use crate::provider::AnyProvider;
use crate::sink::{ConsoleSink, LogSink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How long `shutdown` waits for receive loops to observe cancellation.
/// The slowest checkpoint is one network receive timeout, so the default
/// settings stop well inside this.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),
    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::ProviderError),
    #[error("Shutdown timeout")]
    ShutdownTimeout,
}

/// Owns every configured provider and one shared sink. Providers run
/// their own receive and purge tasks; the manager only starts them,
/// reports on them, and closes them.
pub struct ServiceManager {
    providers: Vec<AnyProvider>,
}

impl ServiceManager {
    /// Builds providers for the configured listeners, delivering to the
    /// console sink.
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        Self::with_sink(config, Arc::new(ConsoleSink::new()))
    }

    /// Same as `new` with a caller-supplied sink. Settings problems and
    /// unparseable patterns surface here, before anything starts.
    pub fn with_sink(config: &Config, sink: Arc<dyn LogSink>) -> Result<Self, ServiceError> {
        let mut providers = Vec::new();
        for settings in config.provider_settings()? {
            providers.push(AnyProvider::build(settings, sink.clone())?);
        }
        info!("Initialized {} providers", providers.len());
        Ok(Self { providers })
    }

    /// Starts every provider, failing on the first bind error. Providers
    /// already started stay running; callers decide whether to shut down
    /// or retry.
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        for provider in &mut self.providers {
            provider.start().await?;
        }
        Ok(())
    }

    /// Runs until SIGINT or SIGTERM, then closes every provider and waits
    /// a bounded grace period for their loops to stop.
    pub async fn run_until_shutdown(&mut self) -> Result<(), ServiceError> {
        self.start().await?;

        let shutdown_signal = super::shutdown::wait_for_signal();
        tokio::pin!(shutdown_signal);
        loop {
            tokio::select! {
                result = &mut shutdown_signal => {
                    if let Err(e) = result {
                        error!("Signal handler failed: {e}");
                    }
                    break;
                }
                () = tokio::time::sleep(STATUS_LOG_INTERVAL) => self.log_status(),
            }
        }

        self.shutdown().await
    }

    /// Fire-and-forget close of every provider, then a bounded wait for
    /// their receive loops to finish.
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Closing {} providers", self.providers.len());
        for provider in &mut self.providers {
            provider.close();
        }

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.providers.iter().any(AnyProvider::is_active) {
            if Instant::now() >= deadline {
                for provider in &self.providers {
                    if provider.is_active() {
                        warn!("Provider {} still active after grace period", provider.name());
                    }
                }
                return Err(ServiceError::ShutdownTimeout);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        info!("All providers stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.providers.iter().any(AnyProvider::is_active)
    }

    pub fn providers(&self) -> &[AnyProvider] {
        &self.providers
    }

    fn log_status(&self) {
        for provider in &self.providers {
            let status = provider.status();
            match &status.last_error {
                Some(e) => debug!(
                    "Provider {}: {} (active={}, last error: {e})",
                    provider.name(),
                    status.state,
                    status.is_active
                ),
                None => debug!(
                    "Provider {}: {} (active={})",
                    provider.name(),
                    status.state,
                    status.is_active
                ),
            }
        }
    }
}
