//! # homerelay-app
//!
//! Application layer — the dispatcher and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `EventPublisher` — publish controller events (discovery responses)
//!   - `Actuator` — send a catalogued action to a physical device
//! - Provide the **`Dispatcher`** (driving/inbound use-case): classify each
//!   inbound event, answer discovery, resolve and start actuations
//! - Provide **in-process infrastructure** that doesn't need IO (per-device
//!   actuation locks)
//!
//! ## Dependency rule
//! Depends on `homerelay-domain` only (plus `tokio` for tasks and locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actuation;
pub mod dispatcher;
pub mod ports;
