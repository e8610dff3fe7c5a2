//! Ports layer for the MQTT adapter.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: handlers decoding inbound messages
//! - Outbound (Driven) ports: the publish/subscribe transport

pub mod handler;
pub mod transport;

pub use handler::Handler;
pub use transport::{
    Message, MessageCallback, QoS, SubscriptionId, TransportClient, TransportError,
};
