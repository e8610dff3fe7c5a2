//! # Inbound Funnel
//!
//! Handlers bound on several topics feed one bounded funnel. The consumer
//! drains it in arrival order; a full funnel refuses new requests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mqtt_adapter::{
        AdapterConfig, InMemoryBroker, Message, MessageCallback, MqttAdapter, QoS,
        TransportClient, UplinkHandler,
    };
    use router_core::{Adapter, AtomicMetrics};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn adapter(broker: &Arc<InMemoryBroker>, funnel_capacity: usize) -> (MqttAdapter, Arc<AtomicMetrics>) {
        let metrics = Arc::new(AtomicMetrics::new());
        let config = AdapterConfig {
            funnel_capacity,
            ..AdapterConfig::default()
        };
        let adapter = MqttAdapter::new(broker.clone(), &config, metrics.clone());
        (adapter, metrics)
    }

    async fn listen(broker: &InMemoryBroker, topic: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let on_message: MessageCallback = Arc::new(move |message: Message| {
            let _ = tx.send(message);
        });
        broker
            .subscribe(topic, QoS::ExactlyOnce, on_message)
            .await
            .unwrap();
        rx
    }

    async fn publish(broker: &InMemoryBroker, topic: &str, payload: &str) {
        broker
            .publish(topic, QoS::ExactlyOnce, false, payload.as_bytes().to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_handlers_share_one_fifo_funnel() {
        let broker = Arc::new(InMemoryBroker::new());
        let (adapter, metrics) = adapter(&broker, 16);
        adapter
            .bind(Arc::new(UplinkHandler::new("devices/+/up").unwrap()))
            .await
            .unwrap();
        adapter
            .bind(Arc::new(UplinkHandler::new("gateways/+/up").unwrap()))
            .await
            .unwrap();

        publish(&broker, "devices/d1/up", "d1").await;
        publish(&broker, "gateways/g1/up", "g1").await;
        publish(&broker, "devices/d2/up", "d2").await;

        for expected in ["d1", "g1", "d2"] {
            let (packet, _an) = adapter.next().await.unwrap();
            assert_eq!(packet, expected.as_bytes().to_vec());
        }
        assert_eq!(metrics.snapshot().inbound, 3);
    }

    #[tokio::test]
    async fn test_full_funnel_refuses_new_requests() {
        let broker = Arc::new(InMemoryBroker::new());
        let (adapter, metrics) = adapter(&broker, 2);
        adapter
            .bind(Arc::new(
                UplinkHandler::new("devices/+/up")
                    .unwrap()
                    .with_metrics(metrics.clone()),
            ))
            .await
            .unwrap();
        let mut refused_replies = listen(&broker, "devices/d3/down").await;

        publish(&broker, "devices/d1/up", "d1").await;
        publish(&broker, "devices/d2/up", "d2").await;
        publish(&broker, "devices/d3/up", "d3").await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inbound, 3);
        assert_eq!(snapshot.funnel_overflows, 1);

        // Queued requests are untouched by the overflow
        let (first, _an) = adapter.next().await.unwrap();
        let (second, _an) = adapter.next().await.unwrap();
        assert_eq!(first, b"d1".to_vec());
        assert_eq!(second, b"d2".to_vec());

        // The refused request never gets an answer
        assert!(timeout(Duration::from_millis(50), refused_replies.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_answers_reach_their_own_downlink() {
        let broker = Arc::new(InMemoryBroker::new());
        let (adapter, _metrics) = adapter(&broker, 16);
        adapter
            .bind(Arc::new(UplinkHandler::new("devices/+/up").unwrap()))
            .await
            .unwrap();
        let mut d1 = listen(&broker, "devices/d1/down").await;
        let mut d2 = listen(&broker, "devices/d2/down").await;

        publish(&broker, "devices/d1/up", "ping-1").await;
        publish(&broker, "devices/d2/up", "ping-2").await;

        let (_p1, an1) = adapter.next().await.unwrap();
        let (_p2, an2) = adapter.next().await.unwrap();
        // Answer out of order
        an2.accept(b"pong-2".to_vec()).unwrap();
        an1.accept(b"pong-1".to_vec()).unwrap();

        let reply = timeout(Duration::from_secs(1), d1.recv()).await.unwrap().unwrap();
        assert_eq!(reply.payload, b"pong-1".to_vec());
        let reply = timeout(Duration::from_secs(1), d2.recv()).await.unwrap().unwrap();
        assert_eq!(reply.payload, b"pong-2".to_vec());
    }

    #[tokio::test]
    async fn test_next_registration_never_blocks_with_traffic() {
        let broker = Arc::new(InMemoryBroker::new());
        let (adapter, _metrics) = adapter(&broker, 16);
        adapter
            .bind(Arc::new(UplinkHandler::new("devices/+/up").unwrap()))
            .await
            .unwrap();
        publish(&broker, "devices/d1/up", "d1").await;

        let registration = timeout(Duration::from_millis(10), adapter.next_registration())
            .await
            .expect("must not block");
        assert!(matches!(registration, Ok(None)));

        // The packet is still there for next
        let (packet, _an) = adapter.next().await.unwrap();
        assert_eq!(packet, b"d1".to_vec());
    }
}
