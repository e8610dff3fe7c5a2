//! # Inbound Requests
//!
//! Messages that flow through the adapter's funnel channels.
//!
//! ```text
//! [handler] ──PktReq──→ packets channel ──next()──→ [consumer]
//!     ↑                                                 │
//!     └──────────── MsgRes (oneshot) ←── accept/reject ─┘
//! ```
//!
//! ## Backpressure
//!
//! Both funnel channels are bounded. Handlers enqueue packets with
//! [`enqueue_packet`], which never blocks the transport's delivery context:
//! when the channel is full the request is refused and its response channel
//! is dropped, so the waiting handler observes "no answer".

use router_core::{AdapterError, Registration};
use tokio::sync::{mpsc, oneshot};

/// Answer routed back through a request's response channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgRes {
    /// The consumer accepted the request and produced this reply.
    Accepted(Vec<u8>),
    /// The consumer rejected the request.
    Rejected(String),
}

/// Inbound packet waiting for the consumer.
#[derive(Debug)]
pub struct PktReq {
    /// The raw packet as received.
    pub packet: Vec<u8>,
    /// Write-once channel for the consumer's answer.
    pub chresp: oneshot::Sender<MsgRes>,
}

impl PktReq {
    /// Create a request and the receiver its answer will arrive on.
    #[must_use]
    pub fn new(packet: Vec<u8>) -> (Self, oneshot::Receiver<MsgRes>) {
        let (chresp, response) = oneshot::channel();
        (Self { packet, chresp }, response)
    }
}

/// Inbound registration waiting for the consumer.
#[derive(Debug)]
pub struct RegReq {
    /// The registration as received.
    pub registration: Box<dyn Registration>,
    /// Write-once channel for the consumer's answer.
    pub chresp: oneshot::Sender<MsgRes>,
}

/// Push a packet request into the funnel without waiting.
///
/// # Errors
///
/// `FailedOperation` when the funnel is full or the adapter is gone.
pub fn enqueue_packet(packets: &mpsc::Sender<PktReq>, request: PktReq) -> Result<(), AdapterError> {
    packets.try_send(request).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => {
            AdapterError::FailedOperation("Packet funnel is full".to_string())
        }
        mpsc::error::TrySendError::Closed(_) => {
            AdapterError::FailedOperation("Packet funnel is closed".to_string())
        }
    })
}
