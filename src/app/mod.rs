//! Application wiring: configuration, logging setup, the service manager
//! and the process entry point.

pub mod config;
pub mod logging;
pub mod service;
pub mod shutdown;

pub use config::{Config, ConfigError, Format, ListenerConfig, LogFormat, LogLevel};
pub use logging::setup_logging;
pub use service::{ServiceError, ServiceManager};

use crate::domain::IngestError;
use tracing::{error, info};

pub struct App {
    manager: ServiceManager,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::load(args)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self, IngestError> {
        // Losing the race for the global subscriber is fine; whoever won
        // is already logging.
        if let Err(e) = logging::setup_logging(config.log_level, config.log_format) {
            eprintln!("Failed to initialize logging: {e}");
        }

        info!("Starting argus-log-ingest v{}", env!("CARGO_PKG_VERSION"));
        let manager = ServiceManager::new(config).map_err(IngestError::Service)?;
        Ok(Self { manager })
    }

    pub async fn run(mut self) -> Result<(), IngestError> {
        self.manager
            .run_until_shutdown()
            .await
            .map_err(IngestError::Service)?;
        info!("argus-log-ingest stopped");
        Ok(())
    }
}

pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = match App::from_args(std::env::args()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("Application error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
