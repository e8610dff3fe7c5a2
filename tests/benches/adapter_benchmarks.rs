//! # MQTT Adapter Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Topics | Filter matching with `+` and `#` |
//! | Dispatch | In-memory publish to many subscriptions |
//! | Funnel | Uplink message to `next` |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mqtt_adapter::domain::topic;
use mqtt_adapter::{
    AdapterConfig, InMemoryBroker, Message, MessageCallback, MqttAdapter, QoS, TransportClient,
    UplinkHandler,
};
use router_core::{Adapter, NoOpMetrics};

// ============================================================================
// Topic matching
// ============================================================================

fn bench_topic_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("topic-matching");

    let cases = [
        ("exact", "devices/d1/up", "devices/d1/up"),
        ("single-level", "devices/+/up", "devices/d1/up"),
        ("multi-level", "devices/#", "devices/d1/sensors/temp/up"),
        ("miss", "gateways/+/up", "devices/d1/up"),
    ];
    for (name, filter, topic) in cases {
        group.bench_function(name, |b| {
            b.iter(|| black_box(topic::matches(black_box(filter), black_box(topic))))
        });
    }

    group.finish();
}

// ============================================================================
// In-memory dispatch
// ============================================================================

fn bench_broker_dispatch(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => panic!("tokio runtime: {e}"),
    };
    let mut group = c.benchmark_group("broker-dispatch");
    group.measurement_time(Duration::from_secs(5));

    for subscriptions in [1usize, 10, 100] {
        let broker = InMemoryBroker::new();
        runtime.block_on(async {
            for i in 0..subscriptions {
                let noop: MessageCallback = Arc::new(|message: Message| {
                    black_box(message);
                });
                let _ = broker
                    .subscribe(&format!("devices/{i}/+"), QoS::AtMostOnce, noop)
                    .await;
            }
        });

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("publish", subscriptions),
            &subscriptions,
            |b, _| {
                b.to_async(&runtime).iter(|| async {
                    let _ = broker
                        .publish("devices/0/up", QoS::AtMostOnce, false, vec![0u8; 64])
                        .await;
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Inbound funnel
// ============================================================================

fn bench_inbound_funnel(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => panic!("tokio runtime: {e}"),
    };
    let broker = Arc::new(InMemoryBroker::new());
    let adapter = MqttAdapter::new(broker.clone(), &AdapterConfig::default(), Arc::new(NoOpMetrics));
    runtime.block_on(async {
        if let Ok(handler) = UplinkHandler::new("devices/+/up") {
            let _ = adapter.bind(Arc::new(handler)).await;
        }
    });

    c.bench_function("uplink-to-next", |b| {
        b.to_async(&runtime).iter(|| async {
            let _ = broker
                .publish("devices/d1/up", QoS::AtMostOnce, false, vec![0u8; 64])
                .await;
            if let Ok((packet, an)) = adapter.next().await {
                black_box(packet);
                let _ = an.reject("bench".to_string());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_topic_matching,
    bench_broker_dispatch,
    bench_inbound_funnel
);
criterion_main!(benches);
