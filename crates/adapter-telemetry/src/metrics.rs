//! Prometheus metrics for the MQTT adapter.
//!
//! All metrics follow the naming convention: `mqtt_adapter_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., send_total)
//! - **Gauge**: Value that can go up or down (e.g., waiting_for_send)
//! - **Histogram**: Distribution of values (e.g., send_duration_seconds)

use std::time::Duration;

use prometheus::{
    exponential_buckets, linear_buckets, Counter, CounterVec, Encoder, Gauge, Histogram,
    HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use router_core::{AdapterMetrics, SendOutcome};

use crate::TelemetryError;

/// `AdapterMetrics` collector backed by a Prometheus registry.
///
/// Each instance owns its registry, so several adapters (or tests) never
/// collide on metric names.
pub struct PrometheusMetrics {
    registry: Registry,
    sends: Counter,
    send_recipients: Histogram,
    waiting_for_send: Gauge,
    send_duration: HistogramVec,
    recipient_errors: CounterVec,
    inbound: Counter,
    funnel_overflows: Counter,
}

fn init_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

impl PrometheusMetrics {
    /// Create a collector with a fresh registry.
    pub fn new() -> Result<Self, TelemetryError> {
        Self::with_registry(Registry::new())
    }

    /// Create a collector registering into `registry`.
    pub fn with_registry(registry: Registry) -> Result<Self, TelemetryError> {
        let sends = Counter::new("mqtt_adapter_send_total", "Total number of sends")
            .map_err(init_err)?;

        let send_recipients = Histogram::with_opts(
            HistogramOpts::new(
                "mqtt_adapter_send_recipients",
                "Number of recipients addressed per send",
            )
            .buckets(linear_buckets(1.0, 1.0, 10).map_err(init_err)?),
        )
        .map_err(init_err)?;

        let waiting_for_send = Gauge::new(
            "mqtt_adapter_waiting_for_send",
            "Sends currently waiting for their recipients",
        )
        .map_err(init_err)?;

        let send_duration = HistogramVec::new(
            HistogramOpts::new(
                "mqtt_adapter_send_duration_seconds",
                "Time spent in send, by outcome",
            )
            .buckets(exponential_buckets(0.005, 2.0, 12).map_err(init_err)?),
            &["outcome"],
        )
        .map_err(init_err)?;

        let recipient_errors = CounterVec::new(
            Opts::new(
                "mqtt_adapter_recipient_errors_total",
                "Per-recipient errors by kind",
            ),
            &["kind"],
        )
        .map_err(init_err)?;

        let inbound = Counter::new(
            "mqtt_adapter_inbound_messages_total",
            "Inbound messages dispatched to bound handlers",
        )
        .map_err(init_err)?;

        let funnel_overflows = Counter::new(
            "mqtt_adapter_funnel_overflows_total",
            "Inbound requests refused by a full funnel",
        )
        .map_err(init_err)?;

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(sends.clone()),
            Box::new(send_recipients.clone()),
            Box::new(waiting_for_send.clone()),
            Box::new(send_duration.clone()),
            Box::new(recipient_errors.clone()),
            Box::new(inbound.clone()),
            Box::new(funnel_overflows.clone()),
        ];
        for collector in collectors {
            registry.register(collector).map_err(init_err)?;
        }

        Ok(Self {
            registry,
            sends,
            send_recipients,
            waiting_for_send,
            send_duration,
            recipient_errors,
            inbound,
            funnel_overflows,
        })
    }

    /// The registry holding this collector's metrics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode this collector's metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode_metrics(&self.registry)
    }
}

impl AdapterMetrics for PrometheusMetrics {
    fn record_send(&self, recipients: usize) {
        self.sends.inc();
        self.send_recipients.observe(recipients as f64);
    }

    fn waiting_for_send_inc(&self) {
        self.waiting_for_send.inc();
    }

    fn waiting_for_send_dec(&self) {
        self.waiting_for_send.dec();
    }

    fn record_outcome(&self, outcome: SendOutcome, elapsed: Duration) {
        self.send_duration
            .with_label_values(&[outcome.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    fn record_recipient_error(&self, kind: &'static str) {
        self.recipient_errors.with_label_values(&[kind]).inc();
    }

    fn record_inbound(&self) {
        self.inbound.inc();
    }

    fn record_funnel_overflow(&self) {
        self.funnel_overflows.inc();
    }
}

/// Encode every metric of `registry` as Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
}
