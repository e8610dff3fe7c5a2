//! MQTT transport implementation based on rumqttc.
//!
//! Adapts the rumqttc API to the [`TransportClient`] port.
//!
//! # Features
//!
//! - CONNACK confirmation before [`MqttClient::connect`] returns
//! - SUBACK confirmation before `subscribe` returns; a refused filter is an error
//! - Single background task owning the `EventLoop`
//! - Inbound PUBLISH routed to callbacks by topic-filter matching
//! - Reconnection by polling the event loop again after an error. Sessions
//!   are clean, so every routed filter is subscribed again once the broker
//!   reports no session.
//!
//! Requests are queued in order on one connection, so a SUBSCRIBE issued
//! before a PUBLISH reaches the broker first. `publish` returns once the
//! request is queued; QoS retransmission is left to rumqttc.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, SubAck,
    SubscribeReasonCode, Transport,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::{dispatch, Routes};
use crate::config::{AdapterConfig, Scheme, MIN_KEEP_ALIVE_SECS};
use crate::domain::topic;
use crate::ports::{
    Message, MessageCallback, QoS, SubscriptionId, TransportClient, TransportError,
};

/// Pause before polling a failed connection again.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

type AckSender = oneshot::Sender<Result<(), String>>;

/// SUBSCRIBE requests waiting for their SUBACK.
///
/// rumqttc assigns packet ids when it writes a request, so waiters are queued
/// in request order and bound to a packet id on `Outgoing::Subscribe`.
#[derive(Default)]
struct SubAcks {
    queued: VecDeque<AckSender>,
    in_flight: HashMap<u16, AckSender>,
}

impl SubAcks {
    fn sent(&mut self, pkid: u16) {
        match self.queued.pop_front() {
            Some(waiter) => {
                self.in_flight.insert(pkid, waiter);
            }
            None => warn!(pkid = pkid, "SUBSCRIBE sent without a waiter"),
        }
    }

    fn acknowledged(&mut self, ack: &SubAck) {
        let Some(waiter) = self.in_flight.remove(&ack.pkid) else {
            debug!(pkid = ack.pkid, "SUBACK without a waiter");
            return;
        };
        let refused = ack
            .return_codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure));
        let result = if refused {
            Err("broker refused the subscription".to_string())
        } else {
            Ok(())
        };
        let _ = waiter.send(result);
    }

    /// Fail every SUBSCRIBE already written: its SUBACK will never come.
    fn connection_lost(&mut self) {
        for (_, waiter) in self.in_flight.drain() {
            let _ = waiter.send(Err("connection lost before SUBACK".to_string()));
        }
    }
}

/// State shared by the client handle and its event loop task.
struct Shared {
    client: AsyncClient,
    routes: RwLock<Routes>,
    // Held while a request is queued so queue order matches `SubAcks` order
    gate: tokio::sync::Mutex<()>,
    acks: Mutex<SubAcks>,
    ack_timeout: Duration,
}

impl Shared {
    /// Queue a SUBSCRIBE and wait for the broker's SUBACK.
    async fn request_subscription(&self, filter: &str, qos: QoS) -> Result<(), TransportError> {
        let acked = {
            let _gate = self.gate.lock().await;
            let (tx, rx) = oneshot::channel();
            self.acks.lock().queued.push_back(tx);
            if let Err(e) = self.client.subscribe(filter, to_rumqttc(qos)).await {
                self.acks.lock().queued.pop_back();
                return Err(subscribe_error(filter, e.to_string()));
            }
            rx
        };

        match timeout(self.ack_timeout, acked).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(subscribe_error(filter, reason)),
            Ok(Err(_)) => Err(subscribe_error(filter, "event loop stopped".to_string())),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

fn subscribe_error(filter: &str, reason: String) -> TransportError {
    TransportError::Subscribe {
        topic: filter.to_string(),
        reason,
    }
}

/// A connected MQTT client.
pub struct MqttClient {
    shared: Arc<Shared>,
    event_loop: JoinHandle<()>,
}

impl MqttClient {
    /// Connect to the broker described by `config`.
    ///
    /// Returns once the broker has accepted the connection.
    ///
    /// # Errors
    ///
    /// - `TransportError::Connection` - unreachable broker or refused CONNECT
    /// - `TransportError::Timeout` - no CONNACK within `connect_timeout_secs`
    pub async fn connect(config: &AdapterConfig) -> Result<Self, TransportError> {
        let options = mqtt_options(config)?;
        let (client, mut eventloop) = AsyncClient::new(options, config.request_capacity);

        let deadline = Duration::from_secs(config.connect_timeout_secs);
        timeout(deadline, await_connack(&mut eventloop))
            .await
            .map_err(|_| TransportError::Timeout)??;

        info!(
            broker = %config.broker,
            scheme = %config.scheme,
            client_id = %config.client_id,
            "Connected to MQTT broker"
        );

        let shared = Arc::new(Shared {
            client,
            routes: RwLock::new(Routes::new()),
            gate: tokio::sync::Mutex::new(()),
            acks: Mutex::new(SubAcks::default()),
            ack_timeout: deadline,
        });
        let event_loop = tokio::spawn(drive(eventloop, Arc::clone(&shared)));

        Ok(Self { shared, event_loop })
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

#[async_trait]
impl TransportClient for MqttClient {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        topic::validate_name(topic).map_err(|e| TransportError::InvalidTopic(e.to_string()))?;

        self.shared
            .client
            .publish(topic, to_rumqttc(qos), retain, payload)
            .await
            .map_err(|e| TransportError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(
        &self,
        filter: &str,
        qos: QoS,
        on_message: MessageCallback,
    ) -> Result<SubscriptionId, TransportError> {
        topic::validate_filter(filter).map_err(|e| TransportError::InvalidTopic(e.to_string()))?;

        // Route first so nothing delivered right after SUBACK is lost
        let id = self.shared.routes.write().insert(filter, qos, on_message);

        if let Err(e) = self.shared.request_subscription(filter, qos).await {
            self.shared.routes.write().remove(filter, id);
            return Err(e);
        }
        Ok(id)
    }

    async fn unsubscribe(&self, filter: &str, id: SubscriptionId) -> Result<(), TransportError> {
        let _gate = self.shared.gate.lock().await;
        if self.shared.routes.write().remove(filter, id) != Some(true) {
            return Ok(());
        }

        self.shared
            .client
            .unsubscribe(filter)
            .await
            .map_err(|e| TransportError::Unsubscribe {
                topic: filter.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Build rumqttc options for the configured scheme.
fn mqtt_options(config: &AdapterConfig) -> Result<MqttOptions, TransportError> {
    config
        .validate()
        .map_err(|e| TransportError::Connection(e.to_string()))?;
    let (host, port) = config
        .broker_address()
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let mut options = match config.scheme {
        Scheme::Tcp => MqttOptions::new(&config.client_id, host, port),
        Scheme::Tls => {
            let mut options = MqttOptions::new(&config.client_id, host, port);
            options.set_transport(Transport::tls_with_default_config());
            options
        }
        Scheme::Ws => {
            let url = format!("ws://{host}:{port}/mqtt");
            let mut options = MqttOptions::new(&config.client_id, url, port);
            options.set_transport(Transport::Ws);
            options
        }
    };
    options.set_keep_alive(Duration::from_secs(
        config.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS),
    ));
    options.set_clean_session(true);
    Ok(options)
}

/// Poll until the broker answers the CONNECT.
async fn await_connack(eventloop: &mut EventLoop) -> Result<(), TransportError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(rumqttc::Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(());
                }
                return Err(TransportError::Connection(format!(
                    "broker refused connection: {:?}",
                    ack.code
                )));
            }
            Ok(_) => continue,
            Err(e) => return Err(TransportError::Connection(e.to_string())),
        }
    }
}

/// Own the event loop for the lifetime of the client.
async fn drive(mut eventloop: EventLoop, shared: Arc<Shared>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(rumqttc::Packet::Publish(publish))) => {
                let message = Message::new(publish.topic, publish.payload.to_vec());
                let receivers = dispatch(&shared.routes, &message);
                if receivers == 0 {
                    debug!(topic = %message.topic, "No subscription for inbound message");
                }
            }
            Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => shared.acks.lock().sent(pkid),
            Ok(Event::Incoming(rumqttc::Packet::SubAck(ack))) => {
                shared.acks.lock().acknowledged(&ack);
            }
            Ok(Event::Incoming(rumqttc::Packet::ConnAck(ack))) => {
                info!(session_present = ack.session_present, "Reconnected to MQTT broker");
                if !ack.session_present {
                    tokio::spawn(resubscribe(Arc::clone(&shared)));
                }
            }
            Ok(_) => {}
            Err(e) => {
                shared.acks.lock().connection_lost();
                warn!(error = %e, "MQTT connection error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Subscribe again to every routed filter after the broker lost the session.
async fn resubscribe(shared: Arc<Shared>) {
    let filters = shared.routes.read().filters();
    for (filter, qos) in filters {
        match shared.request_subscription(&filter, qos).await {
            Ok(()) => debug!(topic = %filter, "Subscription restored"),
            Err(e) => error!(topic = %filter, error = %e, "Unable to restore subscription"),
        }
    }
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}
