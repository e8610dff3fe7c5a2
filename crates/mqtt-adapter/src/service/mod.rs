//! Service Layer
//!
//! The MQTT implementation of the router's `Adapter` contract, orchestrating
//! the domain types over an injected `TransportClient`.

pub mod ack;
pub mod adapter;


pub use ack::MqttAckNacker;
pub use adapter::{MqttAdapter, SEND_TIMEOUT};
