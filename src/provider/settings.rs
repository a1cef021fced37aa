use super::ProviderError;
use crate::decoder::Decoder;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG4J_PORT: u16 = 9999;
pub const DEFAULT_LOG4NET_PORT: u16 = 9998;
pub const DEFAULT_ENVELOPE_PORT: u16 = 9123;

/// Bound on a blocking datagram receive; the loop re-checks cancellation
/// after each expiry.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_NETWORK_PURGE_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_FILE_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

/// Wire formats a network listener can speak. The file tail is always
/// regex-decoded and configured through `FileTailSettings` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Log4jXml,
    Log4netXml,
    JsonEnvelope,
}

impl WireFormat {
    pub fn decoder(&self) -> Decoder {
        match self {
            Self::Log4jXml => Decoder::Log4jXml,
            Self::Log4netXml => Decoder::Log4netXml,
            Self::JsonEnvelope => Decoder::JsonEnvelope,
        }
    }

    /// Conventional listen port for each protocol family.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Log4jXml => DEFAULT_LOG4J_PORT,
            Self::Log4netXml => DEFAULT_LOG4NET_PORT,
            Self::JsonEnvelope => DEFAULT_ENVELOPE_PORT,
        }
    }
}

/// Settings for a UDP or TCP listener provider. Immutable once the provider
/// is started.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub host: String,
    /// Port 0 binds an ephemeral port, useful for tests.
    pub port: u16,
    pub transport: Transport,
    pub format: WireFormat,
    pub receive_timeout: Duration,
    pub purge_interval: Duration,
}

impl NetworkSettings {
    pub fn new(format: WireFormat) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: format.default_port(),
            transport: Transport::Udp,
            format,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            purge_interval: DEFAULT_NETWORK_PURGE_INTERVAL,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(super) fn validate(&self) -> Result<(), ProviderError> {
        if self.host.trim().is_empty() {
            return Err(ProviderError::InvalidSettings(
                "host must not be empty".to_string(),
            ));
        }
        if self.receive_timeout.is_zero() {
            return Err(ProviderError::InvalidSettings(
                "receive_timeout must be greater than zero".to_string(),
            ));
        }
        if self.purge_interval.is_zero() {
            return Err(ProviderError::InvalidSettings(
                "purge_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self::new(WireFormat::Log4jXml)
    }
}

/// Settings for a polling file-tail provider. Immutable once started.
#[derive(Debug, Clone)]
pub struct FileTailSettings {
    pub path: PathBuf,
    /// Line pattern with named groups from the fixed vocabulary
    /// (description, datetime, type, logger; names matched
    /// case-insensitively). Compiled at construction; an invalid pattern
    /// fails the provider before it starts.
    pub pattern: String,
    /// Read content already in the file at startup instead of starting at
    /// the current end.
    pub load_existing: bool,
    pub poll_interval: Duration,
    pub purge_interval: Duration,
}

impl FileTailSettings {
    pub fn new(path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pattern: pattern.into(),
            load_existing: false,
            poll_interval: DEFAULT_FILE_POLL_INTERVAL,
            purge_interval: DEFAULT_FILE_POLL_INTERVAL,
        }
    }

    pub(super) fn validate(&self) -> Result<(), ProviderError> {
        if self.path.as_os_str().is_empty() {
            return Err(ProviderError::InvalidSettings(
                "path must not be empty".to_string(),
            ));
        }
        if self.pattern.trim().is_empty() {
            return Err(ProviderError::InvalidSettings(
                "pattern must not be empty".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ProviderError::InvalidSettings(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.purge_interval.is_zero() {
            return Err(ProviderError::InvalidSettings(
                "purge_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Opaque settings value a provider is constructed from. Each provider
/// checks the variant it was handed and fails construction on a mismatch.
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    Network(NetworkSettings),
    FileTail(FileTailSettings),
}
