//! Adapters layer for the MQTT adapter.
//!
//! Concrete [`TransportClient`](crate::ports::TransportClient) implementations:
//! - [`MqttClient`] - a real broker connection through `rumqttc`
//! - [`InMemoryBroker`] - an in-process broker for tests and local wiring

pub mod memory;
pub mod rumqtt;

pub use memory::{InMemoryBroker, Operation, OperationKind};
pub use rumqtt::MqttClient;

use std::collections::HashMap;

use crate::domain::topic;
use crate::ports::{Message, MessageCallback, QoS, SubscriptionId};

/// One callback registered on a filter.
struct Route {
    id: SubscriptionId,
    qos: QoS,
    callback: MessageCallback,
}

/// Subscription table: topic filter -> callbacks, in subscription order.
#[derive(Default)]
pub(crate) struct Routes {
    next_id: u64,
    filters: HashMap<String, Vec<Route>>,
}

impl Routes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `callback` on `filter`.
    pub(crate) fn insert(
        &mut self,
        filter: &str,
        qos: QoS,
        callback: MessageCallback,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId::new(self.next_id);
        self.filters
            .entry(filter.to_string())
            .or_default()
            .push(Route { id, qos, callback });
        id
    }

    /// Drop subscription `id` on `filter`.
    ///
    /// Returns `Some(true)` when it was the last one on the filter, `None`
    /// when the subscription is unknown.
    pub(crate) fn remove(&mut self, filter: &str, id: SubscriptionId) -> Option<bool> {
        let routes = self.filters.get_mut(filter)?;
        let index = routes.iter().position(|route| route.id == id)?;
        routes.remove(index);

        if routes.is_empty() {
            self.filters.remove(filter);
            return Some(true);
        }
        Some(false)
    }

    pub(crate) fn contains(&self, filter: &str) -> bool {
        self.filters.contains_key(filter)
    }

    /// Number of distinct filters with at least one subscription.
    pub(crate) fn len(&self) -> usize {
        self.filters.len()
    }

    /// Every subscribed filter with the highest QoS requested on it.
    pub(crate) fn filters(&self) -> Vec<(String, QoS)> {
        self.filters
            .iter()
            .filter_map(|(filter, routes)| {
                routes
                    .iter()
                    .map(|route| route.qos)
                    .max_by_key(|qos| u8::from(*qos))
                    .map(|qos| (filter.clone(), qos))
            })
            .collect()
    }

    fn matching(&self, topic_name: &str) -> Vec<MessageCallback> {
        self.filters
            .iter()
            .filter(|(filter, _)| topic::matches(filter, topic_name))
            .flat_map(|(_, routes)| routes.iter().map(|route| route.callback.clone()))
            .collect()
    }
}

/// Deliver `message` to every route whose filter matches its topic.
///
/// Callbacks are collected first so none runs while `routes` is borrowed.
/// Returns the number of callbacks invoked.
pub(crate) fn dispatch(routes: &parking_lot::RwLock<Routes>, message: &Message) -> usize {
    let callbacks = routes.read().matching(&message.topic);

    for callback in &callbacks {
        callback(message.clone());
    }
    callbacks.len()
}
