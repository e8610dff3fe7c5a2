//! # In-Memory Broker
//!
//! An in-process [`TransportClient`] with MQTT topic-filter semantics.
//!
//! Suitable for tests and single-process wiring; production deployments use
//! [`MqttClient`](super::MqttClient). Every operation is appended to an
//! operation log, and failures can be injected per operation and topic.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{dispatch, Routes};
use crate::domain::topic;
use crate::ports::{
    Message, MessageCallback, QoS, SubscriptionId, TransportClient, TransportError,
};

/// Kind of broker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Publish,
    Subscribe,
    Unsubscribe,
}

/// One entry of the operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub topic: String,
    /// Whether the operation succeeded.
    pub ok: bool,
}

/// In-process broker.
#[derive(Default)]
pub struct InMemoryBroker {
    /// Active subscriptions.
    routes: RwLock<Routes>,

    /// Every operation attempted, in completion order.
    operations: RwLock<Vec<Operation>>,

    /// Operations forced to fail.
    failures: RwLock<HashSet<(OperationKind, String)>>,

    /// Total messages published.
    messages_published: AtomicU64,
}

impl InMemoryBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future `kind` operation on exactly `topic` fail.
    pub fn fail(&self, kind: OperationKind, topic: impl Into<String>) {
        self.failures.write().insert((kind, topic.into()));
    }

    /// Stop injecting failures for `kind` on `topic`.
    pub fn heal(&self, kind: OperationKind, topic: &str) {
        self.failures.write().remove(&(kind, topic.to_string()));
    }

    /// Copy of the operation log.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.read().clone()
    }

    /// Number of successful `kind` operations on `topic`.
    #[must_use]
    pub fn count(&self, kind: OperationKind, topic: &str) -> usize {
        self.operations
            .read()
            .iter()
            .filter(|op| op.ok && op.kind == kind && op.topic == topic)
            .count()
    }

    /// Whether `filter` currently has a subscriber.
    #[must_use]
    pub fn is_subscribed(&self, filter: &str) -> bool {
        self.routes.read().contains(filter)
    }

    /// Number of filters with at least one subscriber.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Total messages published.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    fn should_fail(&self, kind: OperationKind, topic: &str) -> bool {
        self.failures.read().contains(&(kind, topic.to_string()))
    }

    fn record(&self, kind: OperationKind, topic: &str, ok: bool) {
        self.operations.write().push(Operation {
            kind,
            topic: topic.to_string(),
            ok,
        });
    }
}

#[async_trait]
impl TransportClient for InMemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        _qos: QoS,
        _retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        topic::validate_name(topic).map_err(|e| TransportError::InvalidTopic(e.to_string()))?;

        if self.should_fail(OperationKind::Publish, topic) {
            self.record(OperationKind::Publish, topic, false);
            return Err(TransportError::Publish {
                topic: topic.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        self.record(OperationKind::Publish, topic, true);
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let receivers = dispatch(&self.routes, &Message::new(topic, payload));
        debug!(topic = %topic, receivers = receivers, "Message published");
        Ok(())
    }

    async fn subscribe(
        &self,
        filter: &str,
        qos: QoS,
        on_message: MessageCallback,
    ) -> Result<SubscriptionId, TransportError> {
        topic::validate_filter(filter).map_err(|e| TransportError::InvalidTopic(e.to_string()))?;

        if self.should_fail(OperationKind::Subscribe, filter) {
            self.record(OperationKind::Subscribe, filter, false);
            return Err(TransportError::Subscribe {
                topic: filter.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let id = self.routes.write().insert(filter, qos, on_message);
        self.record(OperationKind::Subscribe, filter, true);
        debug!(topic = %filter, subscription = %id, "New subscription created");
        Ok(id)
    }

    async fn unsubscribe(&self, filter: &str, id: SubscriptionId) -> Result<(), TransportError> {
        if self.should_fail(OperationKind::Unsubscribe, filter) {
            self.record(OperationKind::Unsubscribe, filter, false);
            return Err(TransportError::Unsubscribe {
                topic: filter.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let last = self.routes.write().remove(filter, id);
        self.record(OperationKind::Unsubscribe, filter, true);
        debug!(topic = %filter, subscription = %id, last = ?last, "Subscription dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn forward_to(tx: mpsc::UnboundedSender<Message>) -> MessageCallback {
        Arc::new(move |message: Message| {
            let _ = tx.send(message);
        })
    }

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let broker = InMemoryBroker::new();

        broker
            .publish("a/b", QoS::AtMostOnce, false, b"x".to_vec())
            .await
            .unwrap();

        assert_eq!(broker.messages_published(), 1);
        assert_eq!(broker.count(OperationKind::Publish, "a/b"), 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_wildcard_subscriber() {
        let broker = InMemoryBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker
            .subscribe("app/+/up", QoS::ExactlyOnce, forward_to(tx))
            .await
            .unwrap();

        broker
            .publish("app/dev1/up", QoS::ExactlyOnce, false, b"hello".to_vec())
            .await
            .unwrap();
        broker
            .publish("app/dev1/down", QoS::ExactlyOnce, false, b"ignored".to_vec())
            .await
            .unwrap();

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(received.topic, "app/dev1/up");
        assert_eq!(received.payload, b"hello".to_vec());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let broker = InMemoryBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = broker
            .subscribe("a/b", QoS::ExactlyOnce, forward_to(tx))
            .await
            .unwrap();
        assert!(broker.is_subscribed("a/b"));

        broker.unsubscribe("a/b", id).await.unwrap();
        broker
            .publish("a/b", QoS::ExactlyOnce, false, b"x".to_vec())
            .await
            .unwrap();

        assert!(!broker.is_subscribed("a/b"));
        assert_eq!(broker.subscription_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriptions_on_one_filter_are_independent() {
        let broker = InMemoryBroker::new();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();
        let first = broker
            .subscribe("h/eu/down", QoS::ExactlyOnce, forward_to(first_tx))
            .await
            .unwrap();
        let second = broker
            .subscribe("h/eu/down", QoS::ExactlyOnce, forward_to(second_tx))
            .await
            .unwrap();

        broker
            .publish("h/eu/down", QoS::ExactlyOnce, false, b"one".to_vec())
            .await
            .unwrap();
        assert_eq!(first_rx.try_recv().unwrap().payload, b"one".to_vec());
        assert_eq!(second_rx.try_recv().unwrap().payload, b"one".to_vec());

        broker.unsubscribe("h/eu/down", first).await.unwrap();
        assert!(broker.is_subscribed("h/eu/down"));
        broker
            .publish("h/eu/down", QoS::ExactlyOnce, false, b"two".to_vec())
            .await
            .unwrap();
        assert_eq!(second_rx.try_recv().unwrap().payload, b"two".to_vec());

        broker.unsubscribe("h/eu/down", second).await.unwrap();
        assert_eq!(broker.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let broker = InMemoryBroker::new();
        broker.fail(OperationKind::Subscribe, "a/b");
        broker.fail(OperationKind::Publish, "a/c");

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = broker
            .subscribe("a/b", QoS::ExactlyOnce, forward_to(tx))
            .await;
        assert!(matches!(result, Err(TransportError::Subscribe { .. })));
        assert!(!broker.is_subscribed("a/b"));

        let result = broker
            .publish("a/c", QoS::ExactlyOnce, false, b"x".to_vec())
            .await;
        assert!(matches!(result, Err(TransportError::Publish { .. })));
        assert_eq!(broker.messages_published(), 0);

        broker.heal(OperationKind::Publish, "a/c");
        assert!(broker
            .publish("a/c", QoS::ExactlyOnce, false, b"x".to_vec())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_invalid_topics_rejected() {
        let broker = InMemoryBroker::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = broker
            .publish("a/+", QoS::ExactlyOnce, false, b"x".to_vec())
            .await;
        assert!(matches!(result, Err(TransportError::InvalidTopic(_))));

        let result = broker
            .subscribe("a/#/b", QoS::ExactlyOnce, forward_to(tx))
            .await;
        assert!(matches!(result, Err(TransportError::InvalidTopic(_))));
    }
}
