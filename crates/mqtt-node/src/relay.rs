//! # Relay
//!
//! Consumer loop of the node.
//!
//! ```text
//! next() ──→ send(packet, relay recipients) ──→ Ok(answer)  ──→ accept(answer)
//!                                           └─→ Err(error)  ──→ reject(error)
//! ```
//!
//! Each packet is forwarded on its own task so a slow send never holds back
//! the funnel.

use std::sync::Arc;

use mqtt_adapter::MqttRecipient;
use router_core::{AckNacker, Adapter, AdapterError, RawPacket, Recipient};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Forwards every inbound packet to a fixed set of recipients.
pub struct Relay {
    adapter: Arc<dyn Adapter>,
    recipients: Arc<[MqttRecipient]>,
}

impl Relay {
    pub fn new(adapter: Arc<dyn Adapter>, recipients: Vec<MqttRecipient>) -> Self {
        Self {
            adapter,
            recipients: recipients.into(),
        }
    }

    /// Drain the adapter until `shutdown` flips.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error when `next` fails.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), AdapterError> {
        info!(recipients = self.recipients.len(), "Relay started");

        loop {
            tokio::select! {
                next = self.adapter.next() => {
                    let (packet, an) = next?;
                    let adapter = Arc::clone(&self.adapter);
                    let recipients = Arc::clone(&self.recipients);
                    tokio::spawn(async move {
                        forward(adapter.as_ref(), &recipients, packet, an).await;
                    });
                }
                _ = shutdown.changed() => {
                    info!("Relay shutdown signal received");
                    return Ok(());
                }
            }
        }
    }
}

/// Send one packet and answer its origin with the outcome.
pub async fn forward(
    adapter: &dyn Adapter,
    recipients: &[MqttRecipient],
    packet: Vec<u8>,
    an: Box<dyn AckNacker>,
) {
    let targets: Vec<&dyn Recipient> = recipients.iter().map(|r| r as &dyn Recipient).collect();

    let answered = match adapter.send(&RawPacket::new(packet), &targets).await {
        Ok(reply) => {
            debug!(bytes = reply.len(), "Relaying answer");
            an.accept(reply)
        }
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Relay failed");
            an.reject(e.to_string())
        }
    };

    if let Err(e) = answered {
        warn!(error = %e, "Unable to answer origin");
    }
}
