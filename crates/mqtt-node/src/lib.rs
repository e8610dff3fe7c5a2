//! # MQTT Node
//!
//! Relay node built on the MQTT adapter.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (TOML file, or environment)
//! 2. Install the log subscriber
//! 3. Connect to the broker and wait for CONNACK
//! 4. Bind the uplink handler on the relay topic
//! 5. Run the relay loop until Ctrl+C

pub mod config;
pub mod relay;

pub use config::{NodeConfig, NodeConfigError, RecipientConfig, RelayConfig};
pub use relay::Relay;
