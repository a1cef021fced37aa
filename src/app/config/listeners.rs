use crate::provider::settings::{
    DEFAULT_FILE_POLL_INTERVAL, DEFAULT_NETWORK_PURGE_INTERVAL, DEFAULT_RECEIVE_TIMEOUT,
};
use crate::provider::{
    FileTailSettings, NetworkSettings, ProviderSettings, Transport, WireFormat,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Wire format names as they appear on the command line and in config
/// files ("log4j-xml", "log4net-xml", "json-envelope").
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Log4jXml,
    Log4netXml,
    JsonEnvelope,
}

impl From<Format> for WireFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Log4jXml => WireFormat::Log4jXml,
            Format::Log4netXml => WireFormat::Log4netXml,
            Format::JsonEnvelope => WireFormat::JsonEnvelope,
        }
    }
}

/// One `[[listeners]]` entry in a config file, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListenerConfig {
    Udp(NetworkListenerConfig),
    Tcp(NetworkListenerConfig),
    File(FileListenerConfig),
}

impl ListenerConfig {
    pub fn to_settings(&self) -> ProviderSettings {
        match self {
            Self::Udp(net) => ProviderSettings::Network(net.to_network_settings(Transport::Udp)),
            Self::Tcp(net) => ProviderSettings::Network(net.to_network_settings(Transport::Tcp)),
            Self::File(file) => ProviderSettings::FileTail(file.to_file_settings()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkListenerConfig {
    pub format: Format,
    #[serde(default = "default_host")]
    pub host: String,
    /// Defaults to the format's conventional port when omitted.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    #[serde(default = "default_network_purge_interval_ms")]
    pub purge_interval_ms: u64,
}

impl NetworkListenerConfig {
    pub fn resolved_port(&self) -> u16 {
        self.port
            .unwrap_or_else(|| WireFormat::from(self.format).default_port())
    }

    fn to_network_settings(&self, transport: Transport) -> NetworkSettings {
        NetworkSettings {
            host: self.host.clone(),
            port: self.resolved_port(),
            transport,
            format: self.format.into(),
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
            purge_interval: Duration::from_millis(self.purge_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListenerConfig {
    pub path: PathBuf,
    /// Line pattern with named groups (description, datetime, type, logger).
    pub pattern: String,
    #[serde(default)]
    pub load_existing: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub purge_interval_ms: u64,
}

impl FileListenerConfig {
    fn to_file_settings(&self) -> FileTailSettings {
        FileTailSettings {
            path: self.path.clone(),
            pattern: self.pattern.clone(),
            load_existing: self.load_existing,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            purge_interval: Duration::from_millis(self.purge_interval_ms),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_receive_timeout_ms() -> u64 {
    DEFAULT_RECEIVE_TIMEOUT.as_millis() as u64
}

fn default_network_purge_interval_ms() -> u64 {
    DEFAULT_NETWORK_PURGE_INTERVAL.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_FILE_POLL_INTERVAL.as_millis() as u64
}
