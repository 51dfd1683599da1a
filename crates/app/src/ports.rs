//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the dispatcher and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod actuator;
pub mod event_bus;

pub use actuator::{ActuationReport, Actuator};
pub use event_bus::EventPublisher;
