//! # Node Configuration
//!
//! One TOML file with a section per concern:
//!
//! | Section | Type | Purpose |
//! |---------|------|---------|
//! | `[mqtt]` | `AdapterConfig` | Broker connection and funnel |
//! | `[relay]` | `RelayConfig` | Inbound topic and relay recipients |
//! | `[telemetry]` | `TelemetryConfig` | Logs |
//!
//! Missing sections keep their defaults. See `mqtt-node.example.toml`.

use std::env;
use std::fs;
use std::path::Path;

use adapter_telemetry::TelemetryConfig;
use mqtt_adapter::domain::topic;
use mqtt_adapter::{AdapterConfig, ConfigError as AdapterConfigError, MqttRecipient, TopicError};
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum NodeConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The `[mqtt]` section is unusable.
    #[error(transparent)]
    Mqtt(#[from] AdapterConfigError),

    /// The `[relay]` section is unusable.
    #[error("Invalid relay configuration: {0}")]
    Relay(String),
}

impl From<TopicError> for NodeConfigError {
    fn from(err: TopicError) -> Self {
        Self::Relay(err.to_string())
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Broker connection.
    pub mqtt: AdapterConfig,
    /// What to relay and to whom.
    pub relay: RelayConfig,
    /// Logs.
    pub telemetry: TelemetryConfig,
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Topic filter inbound packets arrive on.
    pub topic: String,
    /// Last level of inbound uplink topics.
    pub up_suffix: String,
    /// Last level the answer is published on.
    pub down_suffix: String,
    /// Where every inbound packet is forwarded.
    pub recipients: Vec<RecipientConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            topic: "devices/+/up".to_string(),
            up_suffix: "up".to_string(),
            down_suffix: "down".to_string(),
            recipients: Vec::new(),
        }
    }
}

/// Topic pair of one relay recipient.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecipientConfig {
    pub up: String,
    pub down: String,
}

impl RelayConfig {
    /// Build the relay recipients.
    pub fn recipients(&self) -> Result<Vec<MqttRecipient>, TopicError> {
        self.recipients
            .iter()
            .map(|r| MqttRecipient::new(&r.up, &r.down))
            .collect()
    }

    /// Parse `up,down;up,down` recipient lists.
    fn parse_recipients(list: &str) -> Result<Vec<RecipientConfig>, NodeConfigError> {
        list.split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once(',') {
                Some((up, down)) => Ok(RecipientConfig {
                    up: up.trim().to_string(),
                    down: down.trim().to_string(),
                }),
                None => Err(NodeConfigError::Relay(format!(
                    "recipient {pair:?} is not an up,down pair"
                ))),
            })
            .collect()
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NodeConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| NodeConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, NodeConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| NodeConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MQTT_*`: see `AdapterConfig::from_env`
    /// - `ADAPTER_*`: see `TelemetryConfig::from_env`
    /// - `MQTT_RELAY_TOPIC`: Inbound topic filter (default: devices/+/up)
    /// - `MQTT_RELAY_RECIPIENTS`: `up,down;up,down` topic pairs
    pub fn from_env() -> Result<Self, NodeConfigError> {
        let mut relay = RelayConfig::default();
        if let Ok(topic) = env::var("MQTT_RELAY_TOPIC") {
            relay.topic = topic;
        }
        if let Ok(list) = env::var("MQTT_RELAY_RECIPIENTS") {
            relay.recipients = RelayConfig::parse_recipients(&list)?;
        }

        let config = Self {
            mqtt: AdapterConfig::from_env(),
            relay,
            telemetry: TelemetryConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the node can start with this configuration.
    ///
    /// Recipient topics must stay outside `relay.topic`: the relay would
    /// otherwise pick up its own forwarded packets.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.mqtt.validate()?;
        topic::validate_filter(&self.relay.topic)?;
        if self.relay.up_suffix.is_empty() || self.relay.up_suffix == self.relay.down_suffix {
            return Err(NodeConfigError::Relay(
                "up_suffix must be non-empty and differ from down_suffix".to_string(),
            ));
        }
        if self.relay.recipients.is_empty() {
            return Err(NodeConfigError::Relay(
                "at least one recipient is required".to_string(),
            ));
        }
        for recipient in self.relay.recipients()? {
            for own in [recipient.topic_up(), recipient.topic_down()] {
                if topic::matches(&self.relay.topic, own) {
                    return Err(NodeConfigError::Relay(format!(
                        "recipient topic {own:?} matches relay topic {:?}",
                        self.relay.topic
                    )));
                }
            }
        }
        Ok(())
    }
}
