//! # Error Types
//!
//! Error taxonomy shared by all adapters.

use thiserror::Error;

/// Errors surfaced by an adapter to the router.
///
/// Every adapter operation folds its failures into one of these four kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The packet could not be serialized.
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// A recipient does not expose the capability this adapter needs.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// A transport-level operation failed, or no answer arrived while errors did.
    #[error("Failed operation: {0}")]
    FailedOperation(String),

    /// The remote side broke the request/response contract.
    #[error("Wrong behavior: {0}")]
    WrongBehavior(String),
}

impl AdapterError {
    /// Short, stable label for logs and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPacket(_) => "invalid_packet",
            Self::InvalidRecipient(_) => "invalid_recipient",
            Self::FailedOperation(_) => "failed_operation",
            Self::WrongBehavior(_) => "wrong_behavior",
        }
    }
}

/// Errors raised while turning a packet into bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The packet could not be encoded.
    #[error("Unable to encode packet: {0}")]
    Encoding(String),
}

impl From<PacketError> for AdapterError {
    fn from(err: PacketError) -> Self {
        Self::InvalidPacket(err.to_string())
    }
}
