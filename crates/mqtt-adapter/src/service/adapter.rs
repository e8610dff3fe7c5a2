//! # MQTT Adapter
//!
//! Request/response over publish/subscribe.
//!
//! ## Send
//!
//! ```text
//!            ┌── subscribe(down) ──→ join( publish(up), collect(down, 2s) ) ──→ unsubscribe(down)
//! send ──────┼── ... one task per recipient ...
//!            └── join barrier ──→ aggregate ──→ one payload | one error
//! ```
//!
//! | Responses | Errors | Result |
//! |-----------|--------|--------|
//! | 1 | any | `Ok(payload)` |
//! | ≥ 2 | any | `WrongBehavior` |
//! | 0 | ≥ 1 | `FailedOperation` |
//! | 0 | 0 | `WrongBehavior` |
//!
//! ## Inbound Funnel
//!
//! Bound handlers push into two bounded channels shared by every binding.
//! A single consumer drains them with `next` / `next_registration`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use router_core::{
    AckNacker, Adapter, AdapterError, AdapterMetrics, NextRegistration, Packet, Recipient,
    SendOutcome,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::ack::MqttAckNacker;
use crate::config::AdapterConfig;
use crate::domain::{MqttRecipient, PktReq, RegReq};
use crate::ports::{Handler, Message, MessageCallback, QoS, TransportClient};

/// How long each recipient is given to answer.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// MQTT implementation of [`Adapter`].
pub struct MqttAdapter {
    client: Arc<dyn TransportClient>,
    qos: QoS,
    metrics: Arc<dyn AdapterMetrics>,
    packets_tx: mpsc::Sender<PktReq>,
    packets_rx: Mutex<mpsc::Receiver<PktReq>>,
    registrations_tx: mpsc::Sender<RegReq>,
    // Nothing produces registrations on this transport; kept so the senders
    // handed to handlers stay open.
    _registrations_rx: mpsc::Receiver<RegReq>,
}

/// What one recipient produced.
#[derive(Debug, Default)]
struct Exchange {
    response: Option<Vec<u8>>,
    errors: Vec<AdapterError>,
}

impl MqttAdapter {
    /// Create an adapter over an already connected client.
    pub fn new(
        client: Arc<dyn TransportClient>,
        config: &AdapterConfig,
        metrics: Arc<dyn AdapterMetrics>,
    ) -> Self {
        let capacity = config.funnel_capacity.max(1);
        let (packets_tx, packets_rx) = mpsc::channel(capacity);
        let (registrations_tx, registrations_rx) = mpsc::channel(capacity);

        Self {
            client,
            qos: config.qos,
            metrics,
            packets_tx,
            packets_rx: Mutex::new(packets_rx),
            registrations_tx,
            _registrations_rx: registrations_rx,
        }
    }

    /// Subscribe `handler` to its topic.
    ///
    /// Every matching message is passed to the handler together with the
    /// shared funnel senders.
    ///
    /// # Errors
    ///
    /// `FailedOperation` if the subscription is refused.
    pub async fn bind(&self, handler: Arc<dyn Handler>) -> Result<(), AdapterError> {
        let topic = handler.topic();

        // The client stores this callback, so it must not own the client.
        let client = Arc::downgrade(&self.client);
        let packets = self.packets_tx.clone();
        let registrations = self.registrations_tx.clone();
        let metrics = Arc::clone(&self.metrics);

        let on_message: MessageCallback = Arc::new(move |message: Message| {
            let Some(client) = client.upgrade() else {
                return;
            };
            debug!(topic = %message.topic, "Handle new mqtt message");
            metrics.record_inbound();
            handler.handle(client, &packets, &registrations, message);
        });

        self.client
            .subscribe(&topic, self.qos, on_message)
            .await
            .map_err(|e| {
                error!(topic = %topic, error = %e, "Unable to subscribe handler");
                AdapterError::FailedOperation(e.to_string())
            })?;

        info!(topic = %topic, "Subscribe new handler");
        Ok(())
    }
}

#[async_trait]
impl Adapter for MqttAdapter {
    async fn send(
        &self,
        packet: &dyn Packet,
        recipients: &[&dyn Recipient],
    ) -> Result<Vec<u8>, AdapterError> {
        let started = Instant::now();
        self.metrics.record_send(recipients.len());

        let payload = match packet.marshal_binary() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Unable to marshal packet");
                self.metrics
                    .record_outcome(SendOutcome::InvalidPacket, started.elapsed());
                return Err(e.into());
            }
        };

        debug!(recipients = recipients.len(), "Sending packet");

        let mut errors = Vec::new();
        let mut tasks = JoinSet::new();
        for recipient in recipients {
            let Some(recipient) = recipient.as_any().downcast_ref::<MqttRecipient>() else {
                warn!(recipient = ?recipient, "Recipient is not an MQTT recipient");
                errors.push(AdapterError::InvalidRecipient(
                    "Unable to interpret recipient as MQTT recipient".to_string(),
                ));
                continue;
            };
            tasks.spawn(exchange(
                Arc::clone(&self.client),
                self.qos,
                recipient.clone(),
                payload.clone(),
            ));
        }

        self.metrics.waiting_for_send_inc();
        let mut responses = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(exchange) => {
                    responses.extend(exchange.response);
                    errors.extend(exchange.errors);
                }
                Err(e) => {
                    error!(error = %e, "Recipient task aborted");
                    errors.push(AdapterError::FailedOperation(e.to_string()));
                }
            }
        }
        self.metrics.waiting_for_send_dec();

        for e in &errors {
            self.metrics.record_recipient_error(e.kind());
        }

        let (outcome, result) = aggregate(responses, &errors);
        self.metrics.record_outcome(outcome, started.elapsed());
        if let Err(e) = &result {
            debug!(errors = errors.len(), error = %e, "Send failed");
        }
        result
    }

    async fn next(&self) -> Result<(Vec<u8>, Box<dyn AckNacker>), AdapterError> {
        let mut packets = self.packets_rx.lock().await;
        match packets.recv().await {
            Some(PktReq { packet, chresp }) => {
                Ok((packet, Box::new(MqttAckNacker::new(chresp)) as Box<dyn AckNacker>))
            }
            None => Err(AdapterError::FailedOperation(
                "Packet funnel closed".to_string(),
            )),
        }
    }

    async fn next_registration(&self) -> NextRegistration {
        Ok(None)
    }
}

/// Subscribe, then publish while waiting for the answer, then unsubscribe.
async fn exchange(
    client: Arc<dyn TransportClient>,
    qos: QoS,
    recipient: MqttRecipient,
    payload: Vec<u8>,
) -> Exchange {
    let mut exchange = Exchange::default();
    let down = recipient.topic_down();

    let (tx, mut rx) = mpsc::channel(1);
    let on_message: MessageCallback = Arc::new(move |message: Message| {
        // Only the first answer counts
        let _ = tx.try_send(message.payload);
    });

    // Concurrent sends to one recipient each hold their own subscription
    let subscription = match client.subscribe(down, qos, on_message).await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!(topic = %down, error = %e, "Unable to subscribe to downlink");
            exchange
                .errors
                .push(AdapterError::FailedOperation(e.to_string()));
            return exchange;
        }
    };

    let publish = async {
        client
            .publish(recipient.topic_up(), qos, false, payload)
            .await
    };

    let collect = async {
        let response = timeout(SEND_TIMEOUT, rx.recv()).await.ok().flatten();
        if let Err(e) = client.unsubscribe(down, subscription).await {
            warn!(topic = %down, error = %e, "Unable to unsubscribe from downlink");
        }
        response
    };

    let (published, response) = tokio::join!(publish, collect);

    if let Err(e) = published {
        error!(topic = %recipient.topic_up(), error = %e, "Unable to publish packet");
        exchange
            .errors
            .push(AdapterError::FailedOperation(e.to_string()));
    }
    match &response {
        Some(payload) => debug!(topic = %down, bytes = payload.len(), "Received answer"),
        None => debug!(topic = %down, "No answer before timeout"),
    }
    exchange.response = response;
    exchange
}

/// Fold per-recipient results into the single answer of a send.
fn aggregate(
    mut responses: Vec<Vec<u8>>,
    errors: &[AdapterError],
) -> (SendOutcome, Result<Vec<u8>, AdapterError>) {
    match (responses.len(), errors.len()) {
        (0, 0) => (
            SendOutcome::NoAnswer,
            Err(AdapterError::WrongBehavior(
                "No recipient gave a positive answer".to_string(),
            )),
        ),
        (0, _) => (
            SendOutcome::Failed,
            Err(AdapterError::FailedOperation(
                "No positive response from recipients but got unexpected answers".to_string(),
            )),
        ),
        (1, _) => (SendOutcome::Delivered, Ok(responses.remove(0))),
        _ => (
            SendOutcome::TooManyAnswers,
            Err(AdapterError::WrongBehavior(
                "Received too many positive answers".to_string(),
            )),
        ),
    }
}
