//! MQTT recipients.

use std::any::Any;

use router_core::Recipient;

use super::topic::{self, TopicError};

/// A recipient reachable through a pair of MQTT topics.
///
/// Requests are published on the uplink topic; the single expected answer
/// arrives on the downlink topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttRecipient {
    topic_up: String,
    topic_down: String,
}

impl MqttRecipient {
    /// Create a recipient from its uplink and downlink topics.
    ///
    /// # Errors
    ///
    /// Either topic is empty or contains a wildcard.
    pub fn new(topic_up: impl Into<String>, topic_down: impl Into<String>) -> Result<Self, TopicError> {
        let topic_up = topic_up.into();
        let topic_down = topic_down.into();
        topic::validate_name(&topic_up)?;
        topic::validate_name(&topic_down)?;
        Ok(Self {
            topic_up,
            topic_down,
        })
    }

    /// Topic requests are published on.
    #[must_use]
    pub fn topic_up(&self) -> &str {
        &self.topic_up
    }

    /// Topic the answer is expected on.
    #[must_use]
    pub fn topic_down(&self) -> &str {
        &self.topic_down
    }
}

impl Recipient for MqttRecipient {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
