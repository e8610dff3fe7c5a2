//! # Send Fan-Out
//!
//! A router-side adapter sends to handler nodes that are themselves MQTT
//! adapters, each with an `UplinkHandler` bound and a consumer loop answering
//! through `next`.
//!
//! ```text
//! router.send ──→ handlers/<id>/up ──→ node.next ──→ accept ──→ handlers/<id>/down ──→ router
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use adapter_telemetry::PrometheusMetrics;
    use mqtt_adapter::{AdapterConfig, InMemoryBroker, MqttAdapter, MqttRecipient, UplinkHandler};
    use router_core::{Adapter, AdapterError, AtomicMetrics, NoOpMetrics, RawPacket, Recipient};
    use tokio::time::Instant;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    enum Behaviour {
        Accept(&'static [u8]),
        Reject,
    }

    /// Start a handler node listening on `handlers/+/up` for one id.
    async fn spawn_node(broker: &Arc<InMemoryBroker>, id: &str, behaviour: Behaviour) {
        let node = Arc::new(MqttAdapter::new(
            broker.clone(),
            &AdapterConfig::default(),
            Arc::new(NoOpMetrics),
        ));
        node.bind(Arc::new(
            UplinkHandler::new(format!("handlers/{id}/up")).unwrap(),
        ))
        .await
        .unwrap();

        tokio::spawn(async move {
            while let Ok((_packet, an)) = node.next().await {
                let _ = match &behaviour {
                    Behaviour::Accept(reply) => an.accept(reply.to_vec()),
                    Behaviour::Reject => an.reject("not mine".to_string()),
                };
            }
        });
    }

    fn handler(id: &str) -> MqttRecipient {
        MqttRecipient::new(format!("handlers/{id}/up"), format!("handlers/{id}/down")).unwrap()
    }

    fn router(broker: &Arc<InMemoryBroker>) -> (MqttAdapter, Arc<AtomicMetrics>) {
        let metrics = Arc::new(AtomicMetrics::new());
        let adapter = MqttAdapter::new(broker.clone(), &AdapterConfig::default(), metrics.clone());
        (adapter, metrics)
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_between_adapters() {
        let broker = Arc::new(InMemoryBroker::new());
        spawn_node(&broker, "h1", Behaviour::Accept(b"accepted-by-h1")).await;
        spawn_node(&broker, "h2", Behaviour::Reject).await;
        let (router, metrics) = router(&broker);

        let (h1, h2) = (handler("h1"), handler("h2"));
        let recipients: [&dyn Recipient; 2] = [&h1, &h2];
        let result = router
            .send(&RawPacket::new(b"uplink".to_vec()), &recipients)
            .await;

        assert_eq!(result, Ok(b"accepted-by-h1".to_vec()));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.delivered, 1);
        assert_eq!(snapshot.recipient_errors, 0);
        // Every downlink subscription of the send is gone
        assert!(!broker.is_subscribed("handlers/h1/down"));
        assert!(!broker.is_subscribed("handlers/h2/down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_accepting_nodes_is_wrong_behavior() {
        let broker = Arc::new(InMemoryBroker::new());
        spawn_node(&broker, "h1", Behaviour::Accept(b"one")).await;
        spawn_node(&broker, "h2", Behaviour::Accept(b"two")).await;
        let (router, _metrics) = router(&broker);

        let (h1, h2) = (handler("h1"), handler("h2"));
        let recipients: [&dyn Recipient; 2] = [&h1, &h2];
        let result = router
            .send(&RawPacket::new(b"uplink".to_vec()), &recipients)
            .await;

        assert!(matches!(result, Err(AdapterError::WrongBehavior(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_nodes_rejecting_is_wrong_behavior() {
        let broker = Arc::new(InMemoryBroker::new());
        spawn_node(&broker, "h1", Behaviour::Reject).await;
        let (router, _metrics) = router(&broker);

        let h1 = handler("h1");
        let recipients: [&dyn Recipient; 1] = [&h1];
        let started = Instant::now();
        let result = router
            .send(&RawPacket::new(b"uplink".to_vec()), &recipients)
            .await;

        assert!(matches!(result, Err(AdapterError::WrongBehavior(_))));
        assert!(started.elapsed() >= mqtt_adapter::SEND_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_bounded_by_timeout_not_recipient_count() {
        let broker = Arc::new(InMemoryBroker::new());
        let (router, _metrics) = router(&broker);
        let silent: Vec<MqttRecipient> = (0..20).map(|i| handler(&format!("s{i}"))).collect();
        let recipients: Vec<&dyn Recipient> = silent.iter().map(|r| r as &dyn Recipient).collect();

        let started = Instant::now();
        let result = router
            .send(&RawPacket::new(b"uplink".to_vec()), &recipients)
            .await;

        assert!(matches!(result, Err(AdapterError::WrongBehavior(_))));
        assert!(started.elapsed() < mqtt_adapter::SEND_TIMEOUT + Duration::from_millis(100));
        assert_eq!(broker.subscription_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sends_are_independent() {
        let broker = Arc::new(InMemoryBroker::new());
        spawn_node(&broker, "h1", Behaviour::Accept(b"from-h1")).await;
        spawn_node(&broker, "h2", Behaviour::Accept(b"from-h2")).await;
        let (router, metrics) = router(&broker);

        let (h1, h2) = (handler("h1"), handler("h2"));
        let to_h1: [&dyn Recipient; 1] = [&h1];
        let to_h2: [&dyn Recipient; 1] = [&h2];
        let (p1, p2) = (RawPacket::new(b"a".to_vec()), RawPacket::new(b"b".to_vec()));

        let (first, second) = tokio::join!(router.send(&p1, &to_h1), router.send(&p2, &to_h2));

        assert_eq!(first, Ok(b"from-h1".to_vec()));
        assert_eq!(second, Ok(b"from-h2".to_vec()));
        assert_eq!(metrics.snapshot().sends, 2);
        assert_eq!(metrics.snapshot().waiting_for_send, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_sends_to_one_node() {
        let broker = Arc::new(InMemoryBroker::new());
        spawn_node(&broker, "h1", Behaviour::Accept(b"from-h1")).await;
        let (router, metrics) = router(&broker);

        let h1 = handler("h1");
        let to_h1: [&dyn Recipient; 1] = [&h1];
        let (p1, p2) = (RawPacket::new(b"a".to_vec()), RawPacket::new(b"b".to_vec()));

        let (first, second) = tokio::join!(router.send(&p1, &to_h1), router.send(&p2, &to_h1));

        assert_eq!(first, Ok(b"from-h1".to_vec()));
        assert_eq!(second, Ok(b"from-h1".to_vec()));
        assert_eq!(metrics.snapshot().delivered, 2);
        assert!(!broker.is_subscribed("handlers/h1/down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prometheus_collector_records_sends() {
        let broker = Arc::new(InMemoryBroker::new());
        spawn_node(&broker, "h1", Behaviour::Accept(b"ok")).await;
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());
        let router = MqttAdapter::new(broker.clone(), &AdapterConfig::default(), metrics.clone());

        let (h1, h2) = (handler("h1"), handler("h2"));
        let recipients: [&dyn Recipient; 2] = [&h1, &h2];
        router
            .send(&RawPacket::new(b"uplink".to_vec()), &recipients)
            .await
            .unwrap();

        let text = metrics.encode().unwrap();
        assert!(text.contains("mqtt_adapter_send_total 1"));
        assert!(text.contains("mqtt_adapter_send_duration_seconds_count{outcome=\"delivered\"} 1"));
        assert!(text.contains("mqtt_adapter_waiting_for_send 0"));
    }
}
