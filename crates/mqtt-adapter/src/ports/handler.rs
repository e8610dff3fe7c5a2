//! Inbound (Driving) port: topic handlers.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{PktReq, RegReq};
use crate::ports::transport::{Message, TransportClient};

/// Decoder bound to one topic filter.
///
/// The adapter subscribes to [`Handler::topic`] and calls [`Handler::handle`]
/// for every matching message. A handler may enqueue zero or more requests
/// into the shared funnel channels.
pub trait Handler: Send + Sync {
    /// Topic filter this handler listens on.
    fn topic(&self) -> String;

    /// Decode `message` and enqueue whatever it carries.
    ///
    /// Called on the transport's delivery context: must not block.
    fn handle(
        &self,
        client: Arc<dyn TransportClient>,
        packets: &mpsc::Sender<PktReq>,
        registrations: &mpsc::Sender<RegReq>,
        message: Message,
    );
}
