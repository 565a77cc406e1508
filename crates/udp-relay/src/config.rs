// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::errors::RelayError;
use crate::listener::{DEFAULT_HOST, DEFAULT_PORT};

const DEFAULT_SEND_TIMEOUT_SECS: u64 = 5;

/// Configuration for the relay
#[derive(Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Host to bind the UDP socket to
    pub host: String,
    /// Port to bind the UDP socket to
    pub port: u16,
    /// Event Hubs connection string; `None` runs the relay in log-only mode
    pub connection_string: Option<String>,
    /// Event hub to send to, when not given as `EntityPath` in the connection string
    pub event_hub_name: Option<String>,
    /// Strip surrounding whitespace from messages before forwarding
    pub trim_messages: bool,
    /// Timeout for each send request
    pub send_timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connection_string: None,
            event_hub_name: None,
            trim_messages: false,
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("event_hub_name", &self.event_hub_name)
            .field("trim_messages", &self.trim_messages)
            .field("send_timeout", &self.send_timeout)
            .field("https_proxy", &self.https_proxy)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl RelayConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from any key lookup, `None` meaning unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let non_empty = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());

        let host = non_empty("UDP_RELAY_HOST").unwrap_or(defaults.host);
        let port = match non_empty("UDP_RELAY_PORT") {
            Some(port) => port.trim().parse::<u16>().map_err(|_| {
                RelayError::InvalidConfig(format!("UDP_RELAY_PORT '{}' is not a valid port", port))
            })?,
            None => defaults.port,
        };
        let send_timeout = match non_empty("UDP_RELAY_SEND_TIMEOUT_SECS") {
            Some(secs) => secs.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                RelayError::InvalidConfig(format!(
                    "UDP_RELAY_SEND_TIMEOUT_SECS '{}' is not a number of seconds",
                    secs
                ))
            })?,
            None => defaults.send_timeout,
        };
        let trim_messages = match non_empty("UDP_RELAY_TRIM") {
            Some(val) => parse_bool(&val).ok_or_else(|| {
                RelayError::InvalidConfig(format!(
                    "UDP_RELAY_TRIM '{}' must be one of: true, false, 1, 0, yes, no, on, off",
                    val
                ))
            })?,
            None => defaults.trim_messages,
        };
        let log_level = non_empty("UDP_RELAY_LOG_LEVEL")
            .map(|val| val.trim().to_lowercase())
            .unwrap_or(defaults.log_level);
        let https_proxy = non_empty("HTTPS_PROXY");

        let config = Self {
            host,
            port,
            connection_string: non_empty("EVENT_HUB_CONN_STR"),
            event_hub_name: non_empty("EVENT_HUB_NAME"),
            trim_messages,
            send_timeout,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.port == 0 {
            return Err(RelayError::InvalidConfig(
                "UDP port must be greater than 0".to_string(),
            ));
        }

        if self.host.trim().is_empty() {
            return Err(RelayError::InvalidConfig(
                "UDP_RELAY_HOST cannot be empty".to_string(),
            ));
        }

        if self.send_timeout.is_zero() {
            return Err(RelayError::InvalidConfig(
                "send timeout must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(RelayError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<RelayConfig, RelayError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RelayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 12345);
        assert_eq!(config.connection_string, None);
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]).expect("config should be valid");
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_empty_connection_string_means_log_only() {
        let config = from_pairs(&[("EVENT_HUB_CONN_STR", ""), ("EVENT_HUB_NAME", "")])
            .expect("config should be valid");
        assert_eq!(config.connection_string, None);
        assert!(config.event_hub_name.is_none());
    }

    #[test]
    fn test_all_variables() {
        let config = from_pairs(&[
            ("UDP_RELAY_HOST", "127.0.0.1"),
            ("UDP_RELAY_PORT", "9999"),
            ("UDP_RELAY_TRIM", "TRUE"),
            ("UDP_RELAY_SEND_TIMEOUT_SECS", "30"),
            ("UDP_RELAY_LOG_LEVEL", "DEBUG"),
            ("HTTPS_PROXY", "http://proxy:3128"),
            ("EVENT_HUB_CONN_STR", "Endpoint=sb://ns/;SharedAccessKeyName=a;SharedAccessKey=b"),
            ("EVENT_HUB_NAME", "telemetry"),
        ])
        .expect("config should be valid");

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9999);
        assert!(config.trim_messages);
        assert_eq!(config.send_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy:3128"));
        assert!(config.connection_string.is_some());
        assert_eq!(config.event_hub_name.as_deref(), Some("telemetry"));
    }

    #[test]
    fn test_invalid_port() {
        assert!(from_pairs(&[("UDP_RELAY_PORT", "0")]).is_err());
        assert!(from_pairs(&[("UDP_RELAY_PORT", "70000")]).is_err());
        assert!(from_pairs(&[("UDP_RELAY_PORT", "udp")]).is_err());
    }

    #[test]
    fn test_trim_spellings() {
        for val in ["true", "1", "Yes", " on "] {
            let config = from_pairs(&[("UDP_RELAY_TRIM", val)]).expect("config should be valid");
            assert!(config.trim_messages, "{val:?} should enable trimming");
        }
        for val in ["false", "0", "NO", "off"] {
            let config = from_pairs(&[("UDP_RELAY_TRIM", val)]).expect("config should be valid");
            assert!(!config.trim_messages, "{val:?} should disable trimming");
        }
    }

    #[test]
    fn test_invalid_trim_rejected() {
        let err = from_pairs(&[("UDP_RELAY_TRIM", "maybe")]).unwrap_err();
        assert!(matches!(err, RelayError::InvalidConfig(msg) if msg.contains("UDP_RELAY_TRIM")));
    }

    #[test]
    fn test_invalid_log_level() {
        let config = RelayConfig {
            log_level: "invalid".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(from_pairs(&[("UDP_RELAY_SEND_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_pairs(&[("UDP_RELAY_SEND_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn test_debug_redacts_connection_string() {
        let config = RelayConfig {
            connection_string: Some("SharedAccessKey=topsecret".to_string()),
            ..Default::default()
        };
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("<redacted>"));
        assert!(!debug_str.contains("topsecret"));
    }
}
