//! MQTT relay node entry point.

use std::sync::Arc;

use adapter_telemetry::{init_telemetry, PrometheusMetrics};
use anyhow::{Context, Result};
use mqtt_adapter::{MqttAdapter, MqttClient, UplinkHandler};
use mqtt_node::{NodeConfig, Relay};
use tokio::sync::watch;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  MQTT Relay Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let recipients = config
        .relay
        .recipients()
        .context("Invalid relay recipients")?;
    let metrics = Arc::new(PrometheusMetrics::new()?);

    let client = MqttClient::connect(&config.mqtt)
        .await
        .context("Failed to connect to MQTT broker")?;
    let adapter = Arc::new(MqttAdapter::new(
        Arc::new(client),
        &config.mqtt,
        metrics.clone(),
    ));

    let handler = UplinkHandler::new(config.relay.topic.clone())
        .context("Invalid relay topic")?
        .with_suffixes(&config.relay.up_suffix, &config.relay.down_suffix)
        .with_qos(config.mqtt.qos)
        .with_metrics(metrics.clone());
    adapter
        .bind(Arc::new(handler))
        .await
        .context("Failed to bind relay topic")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = Relay::new(adapter, recipients);
    let relay_task = tokio::spawn(async move { relay.run(shutdown_rx).await });

    info!("Relay is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    if let Err(e) = shutdown_tx.send(true) {
        error!("Failed to send shutdown signal: {}", e);
    }
    relay_task.await?.context("Relay stopped with an error")?;

    debug!(metrics = %metrics.encode()?, "Final metrics");
    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from the file named on the command line or in
/// `MQTT_NODE_CONFIG`, falling back to the environment.
fn load_config() -> Result<NodeConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MQTT_NODE_CONFIG").ok());

    match path {
        Some(path) => NodeConfig::load(&path).with_context(|| format!("Failed to load {path}")),
        None => NodeConfig::from_env().context("Failed to read configuration from environment"),
    }
}
