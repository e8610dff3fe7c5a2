//! Outbound (Driven) port to the publish/subscribe transport.
//!
//! The adapter never talks to a broker directly. Connection lifecycle, wire
//! encoding and QoS delivery live behind [`TransportClient`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a transport client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach or authenticate with the broker.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The broker did not answer in time.
    #[error("Transport operation timed out")]
    Timeout,

    /// A publish was refused.
    #[error("Unable to publish on {topic}: {reason}")]
    Publish { topic: String, reason: String },

    /// A subscription was refused.
    #[error("Unable to subscribe to {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    /// An unsubscription was refused.
    #[error("Unable to unsubscribe from {topic}: {reason}")]
    Unsubscribe { topic: String, reason: String },

    /// The topic is not valid for the operation.
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),
}

/// MQTT delivery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// Acknowledged delivery, duplicates possible.
    AtLeastOnce,
    /// Assured single delivery.
    #[default]
    ExactlyOnce,
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QoS {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(format!("QoS level must be 0, 1 or 2, got {other}")),
        }
    }
}

/// A message delivered by the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    /// Concrete topic the message was published on.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("topic", &self.topic)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Identity of one subscription made through a [`TransportClient`].
///
/// Several subscriptions may share a filter; each is dropped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Callback invoked for every message matching a subscription.
///
/// Runs on the transport's delivery context and must not block.
pub type MessageCallback = Arc<dyn Fn(Message) + Send + Sync>;

/// Publish/subscribe transport client.
///
/// Implementations must tolerate concurrent use from many tasks.
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Publish `payload` on `topic`.
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Subscribe to `filter`, routing matching messages to `on_message`.
    ///
    /// Returns once the broker has acknowledged the subscription. Every call
    /// adds a callback: subscriptions sharing a filter all receive its
    /// messages.
    async fn subscribe(
        &self,
        filter: &str,
        qos: QoS,
        on_message: MessageCallback,
    ) -> Result<SubscriptionId, TransportError>;

    /// Drop subscription `id` on `filter`.
    ///
    /// Other subscriptions on the same filter keep receiving messages; the
    /// broker is only unsubscribed when the last one goes.
    async fn unsubscribe(&self, filter: &str, id: SubscriptionId) -> Result<(), TransportError>;
}
