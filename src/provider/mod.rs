//! Log providers own the pieces of one ingestion pipeline: a transport
//! (UDP socket, TCP listener, or file tail), a decoder for the wire
//! format, the pending-frame queue, and the purge loop that drains it
//! into the sink.
//!
//! Lifecycle is `Idle -> Running -> Closed`. `start` is a no-op with a
//! warning while already running, `close` is fire-and-forget (it cancels
//! the shared token and returns without waiting), and a closed provider
//! can be started again with fresh transport resources. There is no
//! suspend state; `pause` closes the provider.

pub mod file;
pub mod purge;
pub mod settings;
pub mod tcp;
pub mod udp;

pub use file::FileTailProvider;
pub use settings::{
    FileTailSettings, NetworkSettings, ProviderSettings, Transport, WireFormat,
};
pub use tcp::TcpProvider;
pub use udp::UdpProvider;

use crate::sink::LogSink;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Settings mismatch: {0}")]
    SettingsMismatch(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Idle,
    Running,
    Closed,
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

/// Point-in-time snapshot of a provider, for status logging.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub state: ProviderState,
    /// True only while the receive task is alive. `state` reflects the
    /// commanded lifecycle; a crashed receive loop shows up as
    /// `Running` with `is_active == false`.
    pub is_active: bool,
    pub last_error: Option<String>,
}

/// Closed set of provider implementations, dispatched by transport.
pub enum AnyProvider {
    Udp(UdpProvider),
    Tcp(TcpProvider),
    FileTail(FileTailProvider),
}

impl AnyProvider {
    /// Builds the provider matching the settings variant (and, for network
    /// settings, the transport field). Fails fast on invalid settings,
    /// including a regex pattern that does not compile.
    pub fn build(
        settings: ProviderSettings,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, ProviderError> {
        match &settings {
            ProviderSettings::Network(network) => match network.transport {
                Transport::Udp => Ok(Self::Udp(UdpProvider::new(settings, sink)?)),
                Transport::Tcp => Ok(Self::Tcp(TcpProvider::new(settings, sink)?)),
            },
            ProviderSettings::FileTail(_) => {
                Ok(Self::FileTail(FileTailProvider::new(settings, sink)?))
            }
        }
    }

    /// Binds the transport and spawns the receive and purge loops. Bind
    /// failures are reported here so a dead listener is visible at startup.
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        match self {
            Self::Udp(provider) => provider.start().await,
            Self::Tcp(provider) => provider.start().await,
            Self::FileTail(provider) => provider.start().await,
        }
    }

    pub fn close(&mut self) {
        match self {
            Self::Udp(provider) => provider.close(),
            Self::Tcp(provider) => provider.close(),
            Self::FileTail(provider) => provider.close(),
        }
    }

    pub fn pause(&mut self) {
        match self {
            Self::Udp(provider) => provider.pause(),
            Self::Tcp(provider) => provider.pause(),
            Self::FileTail(provider) => provider.pause(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Udp(provider) => provider.is_active(),
            Self::Tcp(provider) => provider.is_active(),
            Self::FileTail(provider) => provider.is_active(),
        }
    }

    pub fn status(&self) -> ProviderStatus {
        match self {
            Self::Udp(provider) => provider.status(),
            Self::Tcp(provider) => provider.status(),
            Self::FileTail(provider) => provider.status(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Udp(provider) => provider.name(),
            Self::Tcp(provider) => provider.name(),
            Self::FileTail(provider) => provider.name(),
        }
    }

    /// Local address the transport actually bound, once running. Useful
    /// when the settings requested port 0.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        match self {
            Self::Udp(provider) => provider.local_addr(),
            Self::Tcp(provider) => provider.local_addr(),
            Self::FileTail(_) => None,
        }
    }
}
