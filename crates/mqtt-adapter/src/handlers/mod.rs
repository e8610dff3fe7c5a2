//! Concrete topic handlers.
//!
//! A handler decodes messages on one topic filter and feeds the adapter's
//! inbound funnel. See [`Handler`](crate::ports::Handler).

pub mod uplink;

pub use uplink::UplinkHandler;
