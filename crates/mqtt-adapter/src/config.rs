//! # Adapter Configuration
//!
//! Broker connection and funnel settings.
//!
//! ## Sources
//!
//! - [`AdapterConfig::default`] - local development broker
//! - [`AdapterConfig::from_env`] - `MQTT_*` environment variables
//! - [`AdapterConfig::load`] / [`AdapterConfig::from_toml_str`] - TOML file
//!
//! ```toml
//! client_id = "router-eu-1"
//! broker = "broker.example.org:8883"
//! scheme = "tls"
//! qos = 2
//! funnel_capacity = 1000
//! ```

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::ports::QoS;
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Smallest keep-alive interval accepted by the client.
pub const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection scheme used to reach the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain TCP.
    #[default]
    Tcp,
    /// TLS over TCP.
    Tls,
    /// WebSocket.
    Ws,
}

impl Scheme {
    /// Port used when the broker address carries none.
    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Tcp => 1883,
            Self::Tls => 8883,
            Self::Ws => 80,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::Ws => "ws",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "tls" => Ok(Self::Tls),
            "ws" => Ok(Self::Ws),
            other => Err(ConfigError::Invalid(format!("unknown scheme {other:?}"))),
        }
    }
}

/// MQTT adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Broker address as `host` or `host:port`.
    pub broker: String,
    /// Connection scheme.
    pub scheme: Scheme,
    /// Delivery level for every publish and subscription.
    pub qos: QoS,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// Time allowed for the broker to acknowledge the connection.
    pub connect_timeout_secs: u64,
    /// Capacity of the client's outgoing request queue.
    pub request_capacity: usize,
    /// Capacity of each inbound funnel channel.
    pub funnel_capacity: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            client_id: "mqtt-adapter".to_string(),
            broker: "localhost:1883".to_string(),
            scheme: Scheme::Tcp,
            qos: QoS::ExactlyOnce,
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
            request_capacity: 64,
            funnel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl AdapterConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MQTT_CLIENT_ID`: Client identifier (default: mqtt-adapter)
    /// - `MQTT_BROKER`: Broker address (default: localhost:1883)
    /// - `MQTT_SCHEME`: tcp, tls or ws (default: tcp)
    /// - `MQTT_QOS`: 0, 1 or 2 (default: 2)
    /// - `MQTT_KEEP_ALIVE_SECS`: Keep-alive interval (default: 30)
    /// - `MQTT_CONNECT_TIMEOUT_SECS`: CONNACK deadline (default: 10)
    /// - `MQTT_FUNNEL_CAPACITY`: Inbound funnel capacity (default: 1000)
    ///
    /// Unparseable values fall back to their default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            client_id: env::var("MQTT_CLIENT_ID").unwrap_or(defaults.client_id),

            broker: env::var("MQTT_BROKER").unwrap_or(defaults.broker),

            scheme: env::var("MQTT_SCHEME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.scheme),

            qos: env::var("MQTT_QOS")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
                .and_then(|v| QoS::try_from(v).ok())
                .unwrap_or(defaults.qos),

            keep_alive_secs: env::var("MQTT_KEEP_ALIVE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.keep_alive_secs),

            connect_timeout_secs: env::var("MQTT_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.connect_timeout_secs),

            request_capacity: defaults.request_capacity,

            funnel_capacity: env::var("MQTT_FUNNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.funnel_capacity),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string. Missing keys keep their default.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::Invalid("client_id must not be empty".to_string()));
        }
        if self.funnel_capacity == 0 {
            return Err(ConfigError::Invalid("funnel_capacity must be positive".to_string()));
        }
        if self.request_capacity == 0 {
            return Err(ConfigError::Invalid("request_capacity must be positive".to_string()));
        }
        if self.keep_alive_secs < MIN_KEEP_ALIVE_SECS {
            return Err(ConfigError::Invalid(format!(
                "keep_alive_secs must be at least {MIN_KEEP_ALIVE_SECS}"
            )));
        }
        self.broker_address()?;
        Ok(())
    }

    /// Split the broker address into host and port.
    ///
    /// The scheme's default port is used when none is given.
    pub fn broker_address(&self) -> Result<(String, u16), ConfigError> {
        let broker = self.broker.trim();
        if broker.is_empty() {
            return Err(ConfigError::Invalid("broker must not be empty".to_string()));
        }

        match broker.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port = port
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("invalid broker port in {broker:?}")))?;
                Ok((host.to_string(), port))
            }
            Some(_) => Err(ConfigError::Invalid(format!("missing broker host in {broker:?}"))),
            None => Ok((broker.to_string(), self.scheme.default_port())),
        }
    }
}
