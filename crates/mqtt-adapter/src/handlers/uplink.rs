//! # Uplink Handler
//!
//! Turns every message on an uplink filter into a packet request and routes
//! the consumer's answer back on the matching downlink topic.
//!
//! ```text
//! app/dev1/up ──→ PktReq ──→ next() ──→ accept(reply) ──→ app/dev1/down
//!                                   └──→ reject(reason) ──→ (nothing published)
//! ```

use std::sync::Arc;

use router_core::{AdapterMetrics, NoOpMetrics};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::domain::topic::{self, TopicError};
use crate::domain::{enqueue_packet, MsgRes, PktReq, RegReq};
use crate::ports::{Handler, Message, QoS, TransportClient};

/// Default last level of uplink topics.
pub const UP_SUFFIX: &str = "up";
/// Default last level of downlink topics.
pub const DOWN_SUFFIX: &str = "down";

/// Handler for request/response traffic on `.../up` and `.../down` topics.
pub struct UplinkHandler {
    filter: String,
    up_suffix: String,
    down_suffix: String,
    qos: QoS,
    metrics: Arc<dyn AdapterMetrics>,
}

impl UplinkHandler {
    /// Listen on `filter`, e.g. `app/+/up`.
    ///
    /// # Errors
    ///
    /// `filter` is not a valid topic filter.
    pub fn new(filter: impl Into<String>) -> Result<Self, TopicError> {
        let filter = filter.into();
        topic::validate_filter(&filter)?;

        Ok(Self {
            filter,
            up_suffix: UP_SUFFIX.to_string(),
            down_suffix: DOWN_SUFFIX.to_string(),
            qos: QoS::default(),
            metrics: Arc::new(NoOpMetrics),
        })
    }

    /// Use other last levels for uplink and downlink topics.
    #[must_use]
    pub fn with_suffixes(mut self, up: impl Into<String>, down: impl Into<String>) -> Self {
        self.up_suffix = up.into();
        self.down_suffix = down.into();
        self
    }

    /// Delivery level for replies.
    #[must_use]
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Report refused requests to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn AdapterMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Handler for UplinkHandler {
    fn topic(&self) -> String {
        self.filter.clone()
    }

    fn handle(
        &self,
        client: Arc<dyn TransportClient>,
        packets: &mpsc::Sender<PktReq>,
        _registrations: &mpsc::Sender<RegReq>,
        message: Message,
    ) {
        let Some(downlink) = topic::swap_suffix(&message.topic, &self.up_suffix, &self.down_suffix)
        else {
            warn!(topic = %message.topic, "Message is not on an uplink topic");
            return;
        };

        let (request, response) = PktReq::new(message.payload);
        if let Err(e) = enqueue_packet(packets, request) {
            self.metrics.record_funnel_overflow();
            warn!(topic = %message.topic, error = %e, "Inbound packet refused");
            return;
        }

        let qos = self.qos;
        tokio::spawn(async move {
            match response.await {
                Ok(MsgRes::Accepted(reply)) => {
                    if let Err(e) = client.publish(&downlink, qos, false, reply).await {
                        error!(topic = %downlink, error = %e, "Unable to publish reply");
                    }
                }
                Ok(MsgRes::Rejected(reason)) => {
                    debug!(topic = %downlink, reason = %reason, "Packet rejected");
                }
                Err(_) => debug!(topic = %downlink, "Packet dropped without answer"),
            }
        });
    }
}
