//! Event publishing port — sends controller events back to the broker.

use std::future::Future;

use homerelay_domain::error::RelayError;
use homerelay_domain::event::OutboundEvent;

/// Publishes events as the controller's own device.
pub trait EventPublisher {
    /// Publish `event` under its event name.
    fn publish(&self, event: OutboundEvent)
    -> impl Future<Output = Result<(), RelayError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: OutboundEvent,
    ) -> impl Future<Output = Result<(), RelayError>> + Send {
        (**self).publish(event)
    }
}
