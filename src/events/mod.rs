//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the fleet, the registry,
//! device supervisors and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Fleet`, `Registry`, `DeviceSupervisor`, `runner::execute`,
//!   `StatusReporter`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Fleet::subscriber_listener()` (fans out to `SubscriberSet`,
//!   which feeds `StateTracker` and `LogWriter`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
