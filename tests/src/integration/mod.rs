//! Cross-crate scenarios over one in-memory broker.

pub mod inbound_funnel;
pub mod send_fanout;
