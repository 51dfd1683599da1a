//! # homerelay-domain
//!
//! Pure domain model for the homerelay radio bridge.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define the **Action Catalog** (devices → named actions → radio parameters)
//!   and its lookup (`resolve`)
//! - Define **Inbound/Outbound events** exchanged with the message broker
//! - **Classify** inbound events as discovery, action request, or unrecognized
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod catalog;
pub mod event;
pub mod identity;
pub mod request;
