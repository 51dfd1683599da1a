//! # homerelayd — homerelay daemon
//!
//! Composition root that wires all adapters together and runs the relay.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Load the action catalog
//! - Open the broker connections and the transmitter adapter
//! - Construct the dispatcher, injecting adapters via port traits
//! - Feed device events to the dispatcher until the stream ends or SIGINT
//! - Tear down: close the connections and wait for in-flight actuations
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_stream::wrappers::ReceiverStream;
use tracing_subscriber::EnvFilter;

use homerelay_adapter_mqtt::MqttBridge;
use homerelay_adapter_transmitter::TransmitterActuator;
use homerelay_app::dispatcher::Dispatcher;
use homerelay_domain::catalog::ActionCatalog;

use crate::config::Config;

/// Upper bound on how long shutdown waits for running transmissions.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Catalog
    let catalog = load_catalog(&config.catalog_path)?;
    tracing::info!(
        path = %config.catalog_path.display(),
        controller_id = %catalog.controller_id(),
        devices = catalog.devices().len(),
        actions = catalog.action_count(),
        "action catalog loaded"
    );

    // Adapters
    let mut bridge = MqttBridge::new(config.mqtt.clone());
    let (publisher, events) = bridge.start();
    let actuator = TransmitterActuator::new(config.transmitter.clone());

    // Dispatcher
    let dispatcher = Dispatcher::new(
        Arc::new(catalog),
        config.mqtt.identity(),
        publisher,
        actuator,
        config.actuation_policy(),
    );

    tokio::select! {
        handled = dispatcher.run(ReceiverStream::new(events)) => {
            tracing::warn!(handled, "event source closed");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested");
        }
    }

    bridge.teardown();
    if tokio::time::timeout(SHUTDOWN_GRACE, dispatcher.drain())
        .await
        .is_err()
    {
        tracing::warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "transmissions still running at shutdown were aborted"
        );
    }
    tracing::info!("homerelayd stopped");

    Ok(())
}

fn load_catalog(path: &Path) -> anyhow::Result<ActionCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    ActionCatalog::from_json_str(&content)
        .with_context(|| format!("invalid catalog {}", path.display()))
}
