//! Dispatcher — routes each inbound event to discovery or actuation.
//!
//! Events are handled one at a time, to completion, in arrival order. The
//! only work that outlives an event is the actuation itself: it is spawned
//! onto the runtime so a slow transmitter never holds up the next event.
//! [`Dispatcher::drain`] waits for those in-flight actuations.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tokio_stream::{Stream, StreamExt};

use homerelay_domain::catalog::{ActionCatalog, ActionEntry};
use homerelay_domain::error::LookupMiss;
use homerelay_domain::event::{InboundEvent, OutboundEvent};
use homerelay_domain::identity::AppIdentity;
use homerelay_domain::request::{Classification, ParsedRequest, classify};

use crate::actuation::{ActuationPolicy, DeviceLocks};
use crate::ports::{Actuator, EventPublisher};

/// What the dispatcher did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The catalog was published as a discovery response.
    DiscoveryPublished,
    /// A discovery response was due but publishing it failed.
    DiscoveryFailed,
    /// The transmitter was started for this device action.
    ActuationStarted { device_id: String, action: String },
    /// The event was logged and dropped.
    Dropped(DropReason),
}

/// Why an event was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The payload was not a request the controller understands.
    Unrecognized,
    /// The request named a device or action missing from the catalog.
    LookupMiss(LookupMiss),
}

/// Routes inbound events using an injected catalog, publisher and actuator.
pub struct Dispatcher<P, A> {
    catalog: Arc<ActionCatalog>,
    identity: AppIdentity,
    publisher: P,
    actuator: Arc<A>,
    locks: Option<DeviceLocks>,
    in_flight: Mutex<JoinSet<()>>,
}

impl<P, A> Dispatcher<P, A>
where
    P: EventPublisher,
    A: Actuator + Send + Sync + 'static,
{
    /// Create a new dispatcher.
    pub fn new(
        catalog: Arc<ActionCatalog>,
        identity: AppIdentity,
        publisher: P,
        actuator: A,
        policy: ActuationPolicy,
    ) -> Self {
        let locks = match policy {
            ActuationPolicy::SerializePerDevice => Some(DeviceLocks::new()),
            ActuationPolicy::Concurrent => None,
        };
        Self {
            catalog,
            identity,
            publisher,
            actuator: Arc::new(actuator),
            locks,
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    /// Consume `events` until the stream ends, handling each in turn.
    ///
    /// Returns the number of events handled.
    pub async fn run<S>(&self, events: S) -> usize
    where
        S: Stream<Item = InboundEvent>,
    {
        let mut events = std::pin::pin!(events);
        let mut handled = 0;
        while let Some(event) = events.next().await {
            self.handle_event(event).await;
            handled += 1;
        }
        tracing::info!(handled, "inbound event stream ended");
        handled
    }

    /// Classify one event and act on it.
    ///
    /// Never fails: every failure is logged and reported through the
    /// returned [`DispatchOutcome`].
    #[tracing::instrument(
        skip_all,
        fields(
            device_type = %event.device_type,
            device_id = %event.device_id,
            event_type = %event.event_type,
        )
    )]
    pub async fn handle_event(&self, event: InboundEvent) -> DispatchOutcome {
        tracing::debug!(
            received_at = %event.received_at,
            format = %event.format,
            payload = %event.payload,
            "device event received"
        );

        match classify(&event, &self.identity) {
            Classification::Discovery => self.publish_discovery().await,
            Classification::ActionRequest(request) => self.dispatch_action(request),
            Classification::Unrecognized(reason) => {
                tracing::warn!(error = %reason, payload = %event.payload, "unrecognized event dropped");
                DispatchOutcome::Dropped(DropReason::Unrecognized)
            }
        }
    }

    async fn publish_discovery(&self) -> DispatchOutcome {
        tracing::debug!(
            devices = self.catalog.devices().len(),
            "sending discovery response"
        );
        match self
            .publisher
            .publish(OutboundEvent::discovery_response(&self.catalog))
            .await
        {
            Ok(()) => DispatchOutcome::DiscoveryPublished,
            Err(err) => {
                tracing::error!(error = %err, "failed to publish discovery response");
                DispatchOutcome::DiscoveryFailed
            }
        }
    }

    fn dispatch_action(&self, request: ParsedRequest) -> DispatchOutcome {
        let entry = match self.catalog.resolve(&request.device_id, &request.action) {
            Ok(entry) => entry.clone(),
            Err(miss) => {
                tracing::warn!(error = %miss, "no action metadata for request");
                return DispatchOutcome::Dropped(DropReason::LookupMiss(miss));
            }
        };

        tracing::debug!(
            target_device = %request.device_id,
            action = %request.action,
            encoding = %entry.encoding,
            delay = entry.delay,
            "starting actuation"
        );
        self.spawn_actuation(request.device_id.clone(), entry);

        DispatchOutcome::ActuationStarted {
            device_id: request.device_id,
            action: request.action,
        }
    }

    fn spawn_actuation(&self, device_id: String, entry: ActionEntry) {
        let actuator = Arc::clone(&self.actuator);
        let locks = self.locks.clone();

        let task = async move {
            let _guard = match &locks {
                Some(locks) => Some(locks.acquire(&device_id).await),
                None => None,
            };
            match actuator.actuate(&entry).await {
                Ok(report) => tracing::info!(
                    target_device = %device_id,
                    action = %entry.action,
                    exit_code = ?report.exit_code,
                    "actuation complete"
                ),
                Err(err) => tracing::error!(
                    target_device = %device_id,
                    action = %entry.action,
                    error = %err,
                    "actuation failed"
                ),
            }
        };

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(task);
    }

    /// Number of actuations still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while in_flight.try_join_next().is_some() {}
        in_flight.len()
    }

    /// Wait for every actuation started so far to finish.
    pub async fn drain(&self) {
        let mut pending = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *in_flight)
        };
        while let Some(result) = pending.join_next().await {
            if let Err(err) = result {
                tracing::error!(error = %err, "actuation task aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homerelay_domain::catalog::DeviceEntry;
    use homerelay_domain::error::RelayError;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::ports::ActuationReport;

    // ── In-memory publisher ────────────────────────────────────────

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<OutboundEvent>>,
        fail: bool,
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(
            &self,
            event: OutboundEvent,
        ) -> impl Future<Output = Result<(), RelayError>> + Send {
            let result = if self.fail {
                Err(RelayError::Transport("broker unavailable".into()))
            } else {
                self.published.lock().unwrap().push(event);
                Ok(())
            };
            async move { result }
        }
    }

    // ── Recording actuator ─────────────────────────────────────────

    #[derive(Default)]
    struct RecordingActuator {
        actuated: Mutex<Vec<ActionEntry>>,
        running: AtomicUsize,
        max_running: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl RecordingActuator {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn actuated(&self) -> Vec<ActionEntry> {
            self.actuated.lock().unwrap().clone()
        }
    }

    impl Actuator for RecordingActuator {
        fn actuate(
            &self,
            entry: &ActionEntry,
        ) -> impl Future<Output = Result<ActuationReport, RelayError>> + Send {
            let entry = entry.clone();
            async move {
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_running.fetch_max(now, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.actuated.lock().unwrap().push(entry);
                self.running.fetch_sub(1, Ordering::SeqCst);
                if self.fail {
                    Err(RelayError::Actuation("exit status 1".into()))
                } else {
                    Ok(ActuationReport {
                        exit_code: Some(0),
                        ..ActuationReport::default()
                    })
                }
            }
        }
    }

    // ── Fixtures ───────────────────────────────────────────────────

    fn catalog() -> Arc<ActionCatalog> {
        let entry = |action: &str, encoding: &str, delay: u32| ActionEntry {
            action: action.to_string(),
            description: String::new(),
            encoding: encoding.to_string(),
            delay,
        };
        Arc::new(
            ActionCatalog::new(
                "AppDevice",
                vec![
                    DeviceEntry {
                        device_id: "Outlet-1".to_string(),
                        description: "433MHz RF Outlet".to_string(),
                        actions: vec![entry("on", "E1", 189), entry("off", "E2", 189)],
                    },
                    DeviceEntry {
                        device_id: "Alarm-1".to_string(),
                        description: "433MHz Home Alarm System".to_string(),
                        actions: vec![entry("panic", "E9", 350)],
                    },
                ],
            )
            .unwrap(),
        )
    }

    fn identity() -> AppIdentity {
        AppIdentity::new("HomeAutomation", "AppDevice")
    }

    fn dispatcher(
        publisher: Arc<RecordingPublisher>,
        actuator: Arc<RecordingActuator>,
        policy: ActuationPolicy,
    ) -> Dispatcher<Arc<RecordingPublisher>, Arc<RecordingActuator>> {
        Dispatcher::new(catalog(), identity(), publisher, actuator, policy)
    }

    fn request(device_id: &str, action: &str) -> InboundEvent {
        InboundEvent::new(
            "HomeAutomation",
            "Phone-1",
            "request",
            format!(r#"{{"d":{{"deviceRequest":{{"deviceId":"{device_id}","action":"{action}"}}}}}}"#),
        )
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_actuate_resolved_action() {
        let publisher = Arc::new(RecordingPublisher::default());
        let actuator = Arc::new(RecordingActuator::default());
        let dispatcher = dispatcher(
            Arc::clone(&publisher),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        let outcome = dispatcher.handle_event(request("Outlet-1", "on")).await;
        dispatcher.drain().await;

        assert_eq!(
            outcome,
            DispatchOutcome::ActuationStarted {
                device_id: "Outlet-1".to_string(),
                action: "on".to_string(),
            }
        );
        let actuated = actuator.actuated();
        assert_eq!(actuated.len(), 1);
        assert_eq!(actuated[0].encoding, "E1");
        assert_eq!(actuated[0].delay, 189);
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_publish_catalog_on_discovery() {
        let publisher = Arc::new(RecordingPublisher::default());
        let actuator = Arc::new(RecordingActuator::default());
        let dispatcher = dispatcher(
            Arc::clone(&publisher),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        let event = InboundEvent::new(
            "HomeAutomation",
            "AppDevice",
            "request",
            r#"{"d":{"deviceRequest":{"deviceId":"AppDevice","action":"discovery"}}}"#,
        );
        let outcome = dispatcher.handle_event(event).await;
        dispatcher.drain().await;

        assert_eq!(outcome, DispatchOutcome::DiscoveryPublished);
        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, "response");
        assert_eq!(published[0].payload, catalog().discovery_payload());
        assert!(actuator.actuated().is_empty());
    }

    #[tokio::test]
    async fn should_drop_unrecognized_payload_without_side_effects() {
        let publisher = Arc::new(RecordingPublisher::default());
        let actuator = Arc::new(RecordingActuator::default());
        let dispatcher = dispatcher(
            Arc::clone(&publisher),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        for payload in [r#"{"foo":"bar"}"#, "not json", ""] {
            let event = InboundEvent::new("HomeAutomation", "AppDevice", "request", payload);
            let outcome = dispatcher.handle_event(event).await;
            assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::Unrecognized));
        }
        dispatcher.drain().await;

        assert!(publisher.published.lock().unwrap().is_empty());
        assert!(actuator.actuated().is_empty());
    }

    #[tokio::test]
    async fn should_drop_unknown_device_without_actuation() {
        let publisher = Arc::new(RecordingPublisher::default());
        let actuator = Arc::new(RecordingActuator::default());
        let dispatcher = dispatcher(
            Arc::clone(&publisher),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        let outcome = dispatcher.handle_event(request("Unknown-Device", "on")).await;
        dispatcher.drain().await;

        assert_eq!(
            outcome,
            DispatchOutcome::Dropped(DropReason::LookupMiss(LookupMiss::UnknownDevice {
                device_id: "Unknown-Device".to_string(),
            }))
        );
        assert!(actuator.actuated().is_empty());
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn should_drop_unknown_action_without_actuation() {
        let publisher = Arc::new(RecordingPublisher::default());
        let actuator = Arc::new(RecordingActuator::default());
        let dispatcher = dispatcher(publisher, Arc::clone(&actuator), ActuationPolicy::default());

        let outcome = dispatcher.handle_event(request("Alarm-1", "on")).await;
        dispatcher.drain().await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Dropped(DropReason::LookupMiss(LookupMiss::UnknownAction { .. }))
        ));
        assert!(actuator.actuated().is_empty());
    }

    #[tokio::test]
    async fn should_report_failed_discovery_publish() {
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..RecordingPublisher::default()
        });
        let dispatcher = dispatcher(
            publisher,
            Arc::new(RecordingActuator::default()),
            ActuationPolicy::default(),
        );

        let event = InboundEvent::new(
            "HomeAutomation",
            "AppDevice",
            "request",
            r#"{"d":{"deviceRequest":{"deviceId":"AppDevice","action":"discovery"}}}"#,
        );
        assert_eq!(
            dispatcher.handle_event(event).await,
            DispatchOutcome::DiscoveryFailed
        );
    }

    #[tokio::test]
    async fn should_keep_dispatching_after_actuation_failure() {
        let actuator = Arc::new(RecordingActuator {
            fail: true,
            ..RecordingActuator::default()
        });
        let dispatcher = dispatcher(
            Arc::new(RecordingPublisher::default()),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        dispatcher.handle_event(request("Outlet-1", "on")).await;
        dispatcher.handle_event(request("Outlet-1", "off")).await;
        dispatcher.drain().await;

        assert_eq!(actuator.actuated().len(), 2);
    }

    #[tokio::test]
    async fn should_not_wait_for_actuation_before_returning() {
        let actuator = Arc::new(RecordingActuator::slow(Duration::from_millis(50)));
        let dispatcher = dispatcher(
            Arc::new(RecordingPublisher::default()),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        dispatcher.handle_event(request("Outlet-1", "on")).await;
        assert!(actuator.actuated().is_empty());
        assert_eq!(dispatcher.in_flight(), 1);

        dispatcher.drain().await;
        assert_eq!(actuator.actuated().len(), 1);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn should_stop_counting_finished_actuations_without_drain() {
        let actuator = Arc::new(RecordingActuator::default());
        let dispatcher = dispatcher(
            Arc::new(RecordingPublisher::default()),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        dispatcher.handle_event(request("Outlet-1", "on")).await;
        let settled = tokio::time::timeout(Duration::from_secs(1), async {
            while dispatcher.in_flight() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await;

        assert!(settled.is_ok());
        assert_eq!(actuator.actuated().len(), 1);
    }

    #[tokio::test]
    async fn should_serialize_overlapping_actuations_of_one_device() {
        let actuator = Arc::new(RecordingActuator::slow(Duration::from_millis(10)));
        let dispatcher = dispatcher(
            Arc::new(RecordingPublisher::default()),
            Arc::clone(&actuator),
            ActuationPolicy::SerializePerDevice,
        );

        dispatcher.handle_event(request("Outlet-1", "on")).await;
        dispatcher.handle_event(request("Outlet-1", "off")).await;
        dispatcher.drain().await;

        assert_eq!(actuator.actuated().len(), 2);
        assert_eq!(actuator.max_running.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_run_different_devices_in_parallel_when_serialized() {
        let actuator = Arc::new(RecordingActuator::slow(Duration::from_millis(10)));
        let dispatcher = dispatcher(
            Arc::new(RecordingPublisher::default()),
            Arc::clone(&actuator),
            ActuationPolicy::SerializePerDevice,
        );

        dispatcher.handle_event(request("Outlet-1", "on")).await;
        dispatcher.handle_event(request("Alarm-1", "panic")).await;
        dispatcher.drain().await;

        assert_eq!(actuator.max_running.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_overlap_same_device_when_concurrent() {
        let actuator = Arc::new(RecordingActuator::slow(Duration::from_millis(10)));
        let dispatcher = dispatcher(
            Arc::new(RecordingPublisher::default()),
            Arc::clone(&actuator),
            ActuationPolicy::Concurrent,
        );

        dispatcher.handle_event(request("Outlet-1", "on")).await;
        dispatcher.handle_event(request("Outlet-1", "off")).await;
        dispatcher.drain().await;

        assert_eq!(actuator.max_running.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_handle_every_event_of_a_stream() {
        let publisher = Arc::new(RecordingPublisher::default());
        let actuator = Arc::new(RecordingActuator::default());
        let dispatcher = dispatcher(
            Arc::clone(&publisher),
            Arc::clone(&actuator),
            ActuationPolicy::default(),
        );

        let events = tokio_stream::iter(vec![
            request("Outlet-1", "on"),
            InboundEvent::new("HomeAutomation", "Phone-1", "request", r#"{"foo":"bar"}"#),
            request("Alarm-1", "panic"),
        ]);
        let handled = dispatcher.run(events).await;
        dispatcher.drain().await;

        assert_eq!(handled, 3);
        let encodings: Vec<_> = actuator
            .actuated()
            .into_iter()
            .map(|entry| entry.encoding)
            .collect();
        assert_eq!(encodings.len(), 2);
        assert!(encodings.contains(&"E1".to_string()));
        assert!(encodings.contains(&"E9".to_string()));
    }
}
