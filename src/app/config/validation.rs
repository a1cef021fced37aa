use super::listeners::ListenerConfig;
use super::{Config, ConfigError};
use crate::decoder::PatternDecoder;
use std::collections::HashSet;

impl Config {
    /// Fails fast on settings that would otherwise only surface once a
    /// provider is running: patterns that do not compile, zero intervals,
    /// clashing listener ports, an empty listener set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let listeners = self.effective_listeners()?;
        if listeners.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "no listeners configured".to_string(),
            ));
        }

        let mut bound: HashSet<(&str, u16)> = HashSet::new();
        for listener in &listeners {
            match listener {
                ListenerConfig::Udp(net) | ListenerConfig::Tcp(net) => {
                    if net.host.trim().is_empty() {
                        return Err(ConfigError::InvalidConfig(
                            "listener host must not be empty".to_string(),
                        ));
                    }
                    if net.receive_timeout_ms == 0 {
                        return Err(ConfigError::InvalidConfig(
                            "receive_timeout_ms must be greater than zero".to_string(),
                        ));
                    }
                    if net.purge_interval_ms == 0 {
                        return Err(ConfigError::InvalidConfig(
                            "purge_interval_ms must be greater than zero".to_string(),
                        ));
                    }
                    let transport = match listener {
                        ListenerConfig::Tcp(_) => "tcp",
                        _ => "udp",
                    };
                    let port = net.resolved_port();
                    // Port 0 binds ephemerally and can repeat.
                    if port != 0 && !bound.insert((transport, port)) {
                        return Err(ConfigError::InvalidConfig(format!(
                            "duplicate {transport} listener on port {port}"
                        )));
                    }
                }
                ListenerConfig::File(file) => {
                    if file.path.as_os_str().is_empty() {
                        return Err(ConfigError::InvalidConfig(
                            "file listener path must not be empty".to_string(),
                        ));
                    }
                    PatternDecoder::new(&file.pattern).map_err(|e| {
                        ConfigError::InvalidConfig(format!(
                            "pattern for {} does not compile: {e}",
                            file.path.display()
                        ))
                    })?;
                    if file.poll_interval_ms == 0 {
                        return Err(ConfigError::InvalidConfig(
                            "poll_interval_ms must be greater than zero".to_string(),
                        ));
                    }
                    if file.purge_interval_ms == 0 {
                        return Err(ConfigError::InvalidConfig(
                            "purge_interval_ms must be greater than zero".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::listeners::{FileListenerConfig, Format, NetworkListenerConfig};
    use super::*;

    fn udp(format: Format, port: u16) -> ListenerConfig {
        ListenerConfig::Udp(NetworkListenerConfig {
            format,
            host: "0.0.0.0".to_string(),
            port: Some(port),
            receive_timeout_ms: 1000,
            purge_interval_ms: 100,
        })
    }

    #[test]
    fn test_all_listeners_disabled_is_rejected() {
        let config = Config {
            disable_log4j: true,
            disable_log4net: true,
            disable_envelope: true,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no listeners"));
    }

    #[test]
    fn test_duplicate_ports_are_rejected() {
        let config = Config {
            listeners: vec![udp(Format::Log4jXml, 9999), udp(Format::Log4netXml, 9999)],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_same_port_on_different_transports_is_allowed() {
        let config = Config {
            listeners: vec![
                udp(Format::Log4jXml, 9999),
                ListenerConfig::Tcp(NetworkListenerConfig {
                    format: Format::Log4jXml,
                    host: "0.0.0.0".to_string(),
                    port: Some(9999),
                    receive_timeout_ms: 1000,
                    purge_interval_ms: 100,
                }),
            ],
            ..Config::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_pattern_fails_validation() {
        let config = Config {
            listeners: vec![ListenerConfig::File(FileListenerConfig {
                path: "/var/log/app.log".into(),
                pattern: "(?P<description>unclosed".to_string(),
                load_existing: false,
                poll_interval_ms: 250,
                purge_interval_ms: 250,
            })],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not compile"));
    }

    #[test]
    fn test_zero_receive_timeout_is_rejected() {
        let config = Config {
            receive_timeout_ms: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("receive_timeout_ms"));
    }
}
