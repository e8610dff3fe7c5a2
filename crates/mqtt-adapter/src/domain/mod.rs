//! Domain layer for the MQTT adapter.
//!
//! Pure types with no transport dependency: topics, recipients and the
//! requests that travel through the inbound funnel.

pub mod recipient;
pub mod requests;
pub mod topic;

pub use recipient::MqttRecipient;
pub use requests::{enqueue_packet, MsgRes, PktReq, RegReq};
pub use topic::TopicError;
