//! # Router Core
//!
//! Contract shared by every transport adapter plugged into the packet router.
//!
//! ## Design Principles
//!
//! - **Transport-agnostic**: Nothing in this crate knows about topics, sockets
//!   or brokers. Adapters down-cast recipients to their own concrete type.
//! - **One outcome per send**: `Adapter::send` yields a single payload or a
//!   single `AdapterError`, never partial results.
//! - **Write-once replies**: `AckNacker` consumes itself, so a request's
//!   response channel cannot be written twice.
//! - **Injected metrics**: Adapters report through an `AdapterMetrics`
//!   capability instead of process-wide counters.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapter;
pub mod errors;
pub mod metrics;
pub mod packet;
pub mod recipient;

pub use adapter::{AckNacker, Adapter, NextRegistration};
pub use errors::{AdapterError, PacketError};
pub use metrics::{AdapterMetrics, AtomicMetrics, MetricsSnapshot, NoOpMetrics, SendOutcome};
pub use packet::{Packet, RawPacket};
pub use recipient::{Recipient, Registration};
