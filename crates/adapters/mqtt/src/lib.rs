//! # homerelay-adapter-mqtt
//!
//! MQTT adapter — bridges the `IoT` platform's message broker into homerelay.
//!
//! ## How it works
//!
//! Two independent connections are opened, mirroring the platform's split
//! between applications and devices:
//!
//! | Connection | Client id | Role |
//! |------------|-----------|------|
//! | application | `a:{org}:{app_id}` | subscribes to every event of the configured device type and forwards them as [`InboundEvent`]s |
//! | device | `d:{org}:{type}:{id}` | publishes the controller's own events (discovery responses) |
//!
//! Both connections reconnect on error with exponential [`Backoff`]; a
//! successful `ConnAck` resets the delay.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `homerelay-app` and `homerelay-domain`.

mod application;
mod backoff;
mod config;
mod device;
mod error;
pub mod topic;

pub use application::inbound_event;
pub use backoff::Backoff;
pub use config::{ApplicationConfig, DeviceConfig, MqttConfig, ReconnectConfig};
pub use device::DevicePublisher;
pub use error::MqttError;

use rumqttc::AsyncClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use homerelay_domain::event::InboundEvent;

/// Owns both broker connections and their background tasks.
pub struct MqttBridge {
    config: MqttConfig,
    clients: Vec<AsyncClient>,
    handles: Vec<JoinHandle<()>>,
}

impl MqttBridge {
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            clients: Vec::new(),
            handles: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Open both connections.
    ///
    /// Device events are delivered on the returned receiver; the returned
    /// publisher sends events as the controller's device.
    pub fn start(&mut self) -> (DevicePublisher, mpsc::Receiver<InboundEvent>) {
        let (publisher, device_handle) = DevicePublisher::connect(&self.config);
        self.clients.push(publisher.client().clone());
        self.handles.push(device_handle);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (app_client, app_handle) = application::spawn(&self.config, tx);
        self.clients.push(app_client);
        self.handles.push(app_handle);

        tracing::info!(
            org = %self.config.org,
            device_type = %self.config.application.device_type,
            "MQTT bridge started"
        );
        (publisher, rx)
    }

    /// Whether [`start`](Self::start) has been called and not torn down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Disconnect both clients and stop their tasks.
    pub fn teardown(&mut self) {
        for client in self.clients.drain(..) {
            if let Err(err) = client.try_disconnect() {
                tracing::debug!(error = %err, "disconnect request not delivered");
            }
        }
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        tracing::info!("MQTT bridge stopped");
    }
}
