//! # MQTT Adapter
//!
//! Routes packets to recipients over an MQTT broker and funnels inbound
//! traffic to the router.
//!
//! ## Send
//!
//! Each recipient owns an uplink topic (requests) and a downlink topic
//! (answers). A send subscribes to every downlink, publishes on every uplink
//! and waits up to [`SEND_TIMEOUT`] for answers. Exactly one answer is a
//! success. Anything else is an error:
//!
//! | Answers | Per-recipient errors | Result |
//! |---------|----------------------|--------|
//! | 1 | any | payload |
//! | ≥ 2 | any | `WrongBehavior` |
//! | 0 | ≥ 1 | `FailedOperation` |
//! | 0 | 0 | `WrongBehavior` |
//!
//! ## Inbound Funnel
//!
//! ```text
//! [broker] ──→ Handler (bound per topic) ──try_send──→ bounded channel ──→ next()
//!                   ↑                                                        │
//!                   └──────────── reply on downlink ←── accept / reject ─────┘
//! ```
//!
//! The funnel holds at most `funnel_capacity` requests. When full, new
//! requests are refused and their senders observe no answer.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/  - MqttClient (rumqttc), InMemoryBroker              │
//! │  handlers/  - UplinkHandler                                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/transport.rs - TransportClient (driven)                  │
//! │  ports/handler.rs   - Handler (driving)                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/  - topics, MqttRecipient, funnel requests              │
//! │  service/ - MqttAdapter, MqttAckNacker                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod handlers;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryBroker, MqttClient, Operation, OperationKind};
pub use config::{AdapterConfig, ConfigError, Scheme};
pub use domain::{MqttRecipient, MsgRes, PktReq, RegReq, TopicError};
pub use handlers::UplinkHandler;
pub use ports::{
    Handler, Message, MessageCallback, QoS, SubscriptionId, TransportClient, TransportError,
};
pub use service::{MqttAckNacker, MqttAdapter, SEND_TIMEOUT};

/// Default capacity of each inbound funnel channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
