use super::listeners::{FileListenerConfig, Format, ListenerConfig, NetworkListenerConfig};
use super::{ConfigError, LogFormat, LogLevel};
use crate::provider::ProviderSettings;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration, from flags, environment and an optional TOML
/// file. Without a config file the three standard UDP listeners start on
/// their conventional ports; a config file's `[[listeners]]` array
/// replaces the flag-derived set entirely.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Listen host for the standard network listeners
    #[arg(long, env = "INGEST_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Use TCP instead of UDP for the standard network listeners
    #[arg(long, env = "INGEST_TCP")]
    pub tcp: bool,

    /// Disable the log4j XML listener
    #[arg(long, env = "DISABLE_LOG4J")]
    pub disable_log4j: bool,

    /// log4j XML listener port
    #[arg(long, env = "LOG4J_PORT", default_value = "9999")]
    pub log4j_port: u16,

    /// Disable the log4net XML listener
    #[arg(long, env = "DISABLE_LOG4NET")]
    pub disable_log4net: bool,

    /// log4net XML listener port
    #[arg(long, env = "LOG4NET_PORT", default_value = "9998")]
    pub log4net_port: u16,

    /// Disable the JSON envelope listener
    #[arg(long, env = "DISABLE_ENVELOPE")]
    pub disable_envelope: bool,

    /// JSON envelope listener port
    #[arg(long, env = "ENVELOPE_PORT", default_value = "9123")]
    pub envelope_port: u16,

    /// Receive timeout for network listeners in milliseconds
    #[arg(long, env = "RECEIVE_TIMEOUT_MS", default_value = "1000")]
    pub receive_timeout_ms: u64,

    /// Purge interval for network listeners in milliseconds
    #[arg(long, env = "PURGE_INTERVAL_MS", default_value = "100")]
    pub purge_interval_ms: u64,

    /// Tail this file as an additional source
    #[arg(long, env = "TAIL_FILE")]
    pub tail_file: Option<PathBuf>,

    /// Line pattern for the tailed file, with named groups from the
    /// vocabulary: description, datetime, type, logger
    #[arg(long, env = "TAIL_PATTERN")]
    pub tail_pattern: Option<String>,

    /// Read content already present in the tailed file at startup
    #[arg(long, env = "TAIL_LOAD_EXISTING")]
    pub tail_load_existing: bool,

    /// Poll interval for the tailed file in milliseconds
    #[arg(long, env = "TAIL_POLL_INTERVAL_MS", default_value = "250")]
    pub tail_poll_interval_ms: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Listener list, config-file only
    #[arg(skip)]
    pub listeners: Vec<ListenerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            tcp: false,
            disable_log4j: false,
            log4j_port: 9999,
            disable_log4net: false,
            log4net_port: 9998,
            disable_envelope: false,
            envelope_port: 9123,
            receive_timeout_ms: 1000,
            purge_interval_ms: 100,
            tail_file: None,
            tail_pattern: None,
            tail_load_existing: false,
            tail_poll_interval_ms: 250,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            config_file: None,
            listeners: Vec::new(),
        }
    }
}

impl Config {
    /// Parses flags and environment, then switches wholesale to the config
    /// file when one is named. Validation runs on the final result.
    pub fn load<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::parse_from(args);
        let config = if let Some(path) = &config.config_file {
            let mut loaded = Self::from_file(path)?;
            loaded.config_file = Some(path.clone());
            loaded
        } else {
            config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The listeners this configuration asks for: the config-file list
    /// when present, otherwise the standard set derived from flags.
    pub fn effective_listeners(&self) -> Result<Vec<ListenerConfig>, ConfigError> {
        if !self.listeners.is_empty() {
            return Ok(self.listeners.clone());
        }

        let network = |format: Format, port: u16| {
            let net = NetworkListenerConfig {
                format,
                host: self.host.clone(),
                port: Some(port),
                receive_timeout_ms: self.receive_timeout_ms,
                purge_interval_ms: self.purge_interval_ms,
            };
            if self.tcp {
                ListenerConfig::Tcp(net)
            } else {
                ListenerConfig::Udp(net)
            }
        };

        let mut listeners = Vec::new();
        if !self.disable_log4j {
            listeners.push(network(Format::Log4jXml, self.log4j_port));
        }
        if !self.disable_log4net {
            listeners.push(network(Format::Log4netXml, self.log4net_port));
        }
        if !self.disable_envelope {
            listeners.push(network(Format::JsonEnvelope, self.envelope_port));
        }
        if let Some(path) = &self.tail_file {
            let pattern = self.tail_pattern.clone().ok_or_else(|| {
                ConfigError::InvalidConfig(
                    "--tail-pattern is required when --tail-file is set".to_string(),
                )
            })?;
            listeners.push(ListenerConfig::File(FileListenerConfig {
                path: path.clone(),
                pattern,
                load_existing: self.tail_load_existing,
                poll_interval_ms: self.tail_poll_interval_ms,
                purge_interval_ms: self.tail_poll_interval_ms,
            }));
        }
        Ok(listeners)
    }

    pub fn provider_settings(&self) -> Result<Vec<ProviderSettings>, ConfigError> {
        Ok(self
            .effective_listeners()?
            .iter()
            .map(ListenerConfig::to_settings)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Transport, WireFormat};
    use std::io::Write;

    #[test]
    fn test_defaults_start_three_udp_listeners() {
        let config = Config::load(["argus-log-ingest"]).unwrap();
        let settings = config.provider_settings().unwrap();
        assert_eq!(settings.len(), 3);

        let ports: Vec<u16> = settings
            .iter()
            .map(|s| {
                let ProviderSettings::Network(net) = s else {
                    panic!("expected network settings");
                };
                assert_eq!(net.transport, Transport::Udp);
                net.port
            })
            .collect();
        assert_eq!(ports, [9999, 9998, 9123]);
    }

    #[test]
    fn test_disable_flags_remove_listeners() {
        let config = Config::load([
            "argus-log-ingest",
            "--disable-log4j",
            "--disable-envelope",
        ])
        .unwrap();
        let settings = config.provider_settings().unwrap();
        assert_eq!(settings.len(), 1);
        let ProviderSettings::Network(net) = &settings[0] else {
            panic!("expected network settings");
        };
        assert_eq!(net.format, WireFormat::Log4netXml);
    }

    #[test]
    fn test_tcp_flag_switches_transport() {
        let config = Config::load(["argus-log-ingest", "--tcp"]).unwrap();
        for settings in config.provider_settings().unwrap() {
            let ProviderSettings::Network(net) = settings else {
                panic!("expected network settings");
            };
            assert_eq!(net.transport, Transport::Tcp);
        }
    }

    #[test]
    fn test_tail_flags_add_file_listener() {
        let config = Config::load([
            "argus-log-ingest",
            "--tail-file",
            "/var/log/app.log",
            "--tail-pattern",
            r"(?P<description>.*)",
            "--tail-load-existing",
        ])
        .unwrap();
        let settings = config.provider_settings().unwrap();
        assert_eq!(settings.len(), 4);
        let ProviderSettings::FileTail(file) = &settings[3] else {
            panic!("expected file tail settings");
        };
        assert!(file.load_existing);
    }

    #[test]
    fn test_tail_file_without_pattern_is_rejected() {
        let err = Config::load(["argus-log-ingest", "--tail-file", "/var/log/app.log"])
            .unwrap_err();
        assert!(err.to_string().contains("tail-pattern"));
    }

    #[test]
    fn test_config_file_listeners_replace_flag_derived_set() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            log_level = "debug"

            [[listeners]]
            kind = "tcp"
            format = "log4j-xml"
            port = 4445

            [[listeners]]
            kind = "file"
            path = "/var/log/app.log"
            pattern = "(?P<description>.*)"
            "#
        )
        .unwrap();

        let config = Config::load([
            "argus-log-ingest",
            "--config-file",
            file.path().to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);

        let settings = config.provider_settings().unwrap();
        assert_eq!(settings.len(), 2);
        assert!(matches!(&settings[0], ProviderSettings::Network(net) if net.port == 4445));
        assert!(matches!(&settings[1], ProviderSettings::FileTail(_)));
    }

    #[test]
    fn test_unreadable_config_file_is_an_error() {
        let err = Config::from_file("/nonexistent/ingest.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileError(_)));
    }
}
