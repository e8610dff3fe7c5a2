//! Packets handed to an adapter for delivery.

use crate::errors::PacketError;

/// Anything the router can push through an adapter.
///
/// Adapters call `marshal_binary` exactly once per send.
pub trait Packet: Send + Sync {
    /// Encode the packet to its wire representation.
    fn marshal_binary(&self) -> Result<Vec<u8>, PacketError>;
}

/// A packet that is already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket(Vec<u8>);

impl RawPacket {
    /// Wrap already-encoded bytes.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Borrow the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RawPacket {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

/// Bytes go out as they are, an empty payload included.
impl Packet for RawPacket {
    fn marshal_binary(&self) -> Result<Vec<u8>, PacketError> {
        Ok(self.0.clone())
    }
}
