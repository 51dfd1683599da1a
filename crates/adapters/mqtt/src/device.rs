//! Device-side connection — publishes the controller's own events.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;

use homerelay_app::ports::EventPublisher;
use homerelay_domain::error::RelayError;
use homerelay_domain::event::OutboundEvent;

use crate::backoff::Backoff;
use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::topic::device_publish_topic;

/// Build the device client options from `config`.
pub(crate) fn options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(config.device_client_id(), config.host(), config.broker_port);
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options.set_clean_session(true);
    if let Some((username, password)) = config.device_credentials() {
        options.set_credentials(username, password);
    }
    options
}

/// [`EventPublisher`] that publishes as the configured device.
#[derive(Clone)]
pub struct DevicePublisher {
    client: AsyncClient,
}

impl DevicePublisher {
    /// Connect the device client. The returned task keeps the connection
    /// alive, reconnecting with backoff, until aborted.
    #[must_use]
    pub fn connect(config: &MqttConfig) -> (Self, JoinHandle<()>) {
        let (client, eventloop) = AsyncClient::new(options(config), config.channel_capacity);

        tracing::info!(
            client_id = %config.device_client_id(),
            host = %config.host(),
            port = config.broker_port,
            "connecting device client"
        );

        let handle = tokio::spawn(run(eventloop, Backoff::new(&config.reconnect)));
        (Self { client }, handle)
    }

    pub(crate) fn client(&self) -> &AsyncClient {
        &self.client
    }

    async fn publish_event(&self, event: OutboundEvent) -> Result<(), MqttError> {
        let topic = device_publish_topic(&event.event_type, &event.format);
        let payload = serde_json::to_vec(&event.payload).map_err(MqttError::PayloadEncode)?;
        tracing::debug!(topic = %topic, bytes = payload.len(), "publishing event");
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(MqttError::Client)
    }
}

impl EventPublisher for DevicePublisher {
    async fn publish(&self, event: OutboundEvent) -> Result<(), RelayError> {
        self.publish_event(event)
            .await
            .map_err(MqttError::into_domain)
    }
}

async fn run(mut eventloop: EventLoop, mut backoff: Backoff) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                backoff.reset();
                tracing::info!("device client connected");
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                tracing::debug!(pkid = ack.pkid, "publish acknowledged");
            }
            Ok(_) => {}
            Err(err) => {
                let delay = backoff.next_delay();
                tracing::error!(
                    error = %err,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "device client error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_authenticate_with_device_token() {
        let mut config = MqttConfig::default();
        config.device.auth_token = Some("token".to_string());
        let options = options(&config);
        assert_eq!(options.client_id(), "d:quickstart:HomeAutomation:Controller-1");
        assert!(options.credentials().is_some());
    }

    #[tokio::test]
    async fn should_queue_publish_without_a_connection() {
        // The event loop is never polled, so the request stays queued.
        let (client, _eventloop) = AsyncClient::new(options(&MqttConfig::default()), 4);
        let publisher = DevicePublisher { client };

        let event = OutboundEvent {
            event_type: "response".to_string(),
            format: "json".to_string(),
            payload: serde_json::json!({"d": {}}),
        };
        assert!(publisher.publish(event).await.is_ok());
    }

    #[tokio::test]
    async fn should_publish_from_a_spawned_task() {
        let (client, _eventloop) = AsyncClient::new(options(&MqttConfig::default()), 4);
        let publisher = DevicePublisher { client };

        let event = OutboundEvent {
            event_type: "response".to_string(),
            format: "json".to_string(),
            payload: serde_json::json!({}),
        };
        let publishing = tokio::spawn(async move { publisher.publish(event).await });
        assert!(publishing.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn should_report_transport_error_when_event_loop_is_gone() {
        let (client, eventloop) = AsyncClient::new(options(&MqttConfig::default()), 4);
        drop(eventloop);
        let publisher = DevicePublisher { client };

        let event = OutboundEvent {
            event_type: "response".to_string(),
            format: "json".to_string(),
            payload: serde_json::json!({}),
        };
        assert!(matches!(
            publisher.publish(event).await,
            Err(RelayError::Transport(_))
        ));
    }
}
