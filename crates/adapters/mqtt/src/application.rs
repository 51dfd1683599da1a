//! Application-side connection — receives device events.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use homerelay_domain::event::InboundEvent;

use crate::backoff::Backoff;
use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::topic::{DeviceEventTopic, device_events_filter};

/// Build the application client options from `config`.
pub(crate) fn options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        config.application_client_id(),
        config.host(),
        config.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options.set_clean_session(true);
    if let Some((username, password)) = config.application_credentials() {
        options.set_credentials(username, password);
    }
    options
}

/// Connect the application client and forward every device event of the
/// configured device type into `events`.
///
/// The returned task runs until `events` is closed or the task is aborted.
pub(crate) fn spawn(
    config: &MqttConfig,
    events: mpsc::Sender<InboundEvent>,
) -> (AsyncClient, JoinHandle<()>) {
    let (client, eventloop) = AsyncClient::new(options(config), config.channel_capacity);
    let filter = device_events_filter(&config.application.device_type);
    let backoff = Backoff::new(&config.reconnect);

    tracing::info!(
        client_id = %config.application_client_id(),
        host = %config.host(),
        port = config.broker_port,
        "connecting application client"
    );

    let handle = tokio::spawn(run(client.clone(), eventloop, filter, events, backoff));
    (client, handle)
}

async fn run(
    client: AsyncClient,
    mut eventloop: EventLoop,
    filter: String,
    events: mpsc::Sender<InboundEvent>,
    mut backoff: Backoff,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                backoff.reset();
                tracing::info!("application client connected");
                // Clean sessions drop subscriptions, so subscribe on every ConnAck.
                match client.try_subscribe(&filter, QoS::AtMostOnce) {
                    Ok(()) => tracing::debug!(filter = %filter, "subscribing to device events"),
                    Err(err) => tracing::error!(error = %err, "failed to subscribe to device events"),
                }
            }
            Ok(Event::Incoming(Packet::SubAck(_))) => {
                tracing::debug!("subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let event = match inbound_event(&publish.topic, &publish.payload) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "ignoring message");
                        continue;
                    }
                };
                tracing::info!(
                    device_type = %event.device_type,
                    device_id = %event.device_id,
                    event_type = %event.event_type,
                    payload = %event.payload,
                    "device event"
                );
                if events.send(event).await.is_err() {
                    tracing::info!("event receiver closed, stopping application client");
                    let _ = client.try_disconnect();
                    return;
                }
            }
            Ok(_) => {}
            Err(err) => {
                let delay = backoff.next_delay();
                tracing::error!(
                    error = %err,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "application client error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Turn a received message into an [`InboundEvent`].
///
/// # Errors
///
/// Returns [`MqttError::InvalidTopic`] when `topic` is not a device event topic.
pub fn inbound_event(topic: &str, payload: &[u8]) -> Result<InboundEvent, MqttError> {
    let topic = DeviceEventTopic::parse(topic)?;
    Ok(InboundEvent::new(
        topic.device_type,
        topic.device_id,
        topic.event_type,
        String::from_utf8_lossy(payload),
    )
    .with_format(topic.format))
}
