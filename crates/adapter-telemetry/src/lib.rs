//! # Adapter Telemetry
//!
//! Observability for the MQTT adapter.
//!
//! ## Components
//!
//! - **Logs**: `tracing` subscriber with env filter, pretty or JSON output
//! - **Metrics**: [`PrometheusMetrics`], an `AdapterMetrics` collector backed
//!   by its own Prometheus registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use adapter_telemetry::{init_telemetry, PrometheusMetrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//!
//! let metrics = Arc::new(PrometheusMetrics::new()?);
//! let adapter = MqttAdapter::new(client, &adapter_config, metrics.clone());
//! // ...
//! println!("{}", metrics.encode()?);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ADAPTER_SERVICE_NAME` | `mqtt-adapter` | Service name in log records |
//! | `ADAPTER_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` wins) |
//! | `ADAPTER_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `ADAPTER_JSON_LOGS` | `false` | JSON log records (default `true` in containers) |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, PrometheusMetrics};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Failed to encode metrics: {0}")]
    Encode(String),
}

/// Install the global log subscriber described by `config`.
///
/// # Errors
///
/// The filter is invalid or a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_tracing(config)?;
    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}
