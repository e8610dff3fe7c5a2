//! Recipients and registrations as seen by the router.
//!
//! Both are opaque here. A recipient is only meaningful to the adapter that
//! knows its concrete type, so adapters recover it with `as_any`.

use std::any::Any;
use std::fmt;

/// Destination of a packet.
pub trait Recipient: fmt::Debug + Send + Sync {
    /// Expose the concrete type for an adapter-side capability check.
    fn as_any(&self) -> &dyn Any;
}

/// An inbound registration request, opaque to adapters.
pub trait Registration: fmt::Debug + Send + Sync {}
