//! # Adapter Contract
//!
//! The contract every transport implements to participate in packet routing.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use router_core::{AckNacker, Adapter, AdapterError, NextRegistration, Packet, Recipient};
//! use async_trait::async_trait;
//!
//! pub struct MyAdapter { /* ... */ }
//!
//! #[async_trait]
//! impl Adapter for MyAdapter {
//!     async fn send(&self, packet: &dyn Packet, recipients: &[&dyn Recipient])
//!         -> Result<Vec<u8>, AdapterError> { /* ... */ }
//!     async fn next(&self) -> Result<(Vec<u8>, Box<dyn AckNacker>), AdapterError> { /* ... */ }
//!     async fn next_registration(&self) -> NextRegistration { Ok(None) }
//! }
//! ```

use crate::errors::AdapterError;
use crate::packet::Packet;
use crate::recipient::{Recipient, Registration};
use async_trait::async_trait;

/// Result of [`Adapter::next_registration`].
///
/// `Ok(None)` means the adapter has nothing to offer, which is not a failure.
pub type NextRegistration = Result<Option<(Box<dyn Registration>, Box<dyn AckNacker>)>, AdapterError>;

/// One-shot handle used to answer an inbound request.
///
/// Both methods consume the handle: a request is answered at most once.
pub trait AckNacker: Send {
    /// Accept the request and route `response` back to its origin.
    fn accept(self: Box<Self>, response: Vec<u8>) -> Result<(), AdapterError>;

    /// Reject the request.
    fn reject(self: Box<Self>, reason: String) -> Result<(), AdapterError>;
}

/// A pluggable packet transport.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Deliver `packet` to every recipient and return the single answer.
    async fn send(
        &self,
        packet: &dyn Packet,
        recipients: &[&dyn Recipient],
    ) -> Result<Vec<u8>, AdapterError>;

    /// Wait for the next inbound packet.
    async fn next(&self) -> Result<(Vec<u8>, Box<dyn AckNacker>), AdapterError>;

    /// Wait for the next inbound registration.
    async fn next_registration(&self) -> NextRegistration;
}
