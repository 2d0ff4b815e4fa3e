//! # fleetvisor
//!
//! **Fleetvisor** keeps one supervised BLE link per vehicle and bridges it to a
//! publish/subscribe bus (MQTT / Home Assistant in deployment).
//!
//! Every vehicle gets a dedicated [`DeviceSupervisor`] that owns its command
//! queue, its connection and its session. Connections are opened lazily when a
//! command arrives, authorized in two phases (wake, then full), kept for as long
//! as commands keep flowing and re-established with backoff when they drop.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   bus client (MQTT)                                      application
//!        │ on_connect / on_message                              │ add_device / remove_device
//!        ▼                                                      ▼
//! ┌──────────────────────┐  push(Command)        ┌───────────────────────────────────────┐
//! │      BusBridge       │──────────────────────►│  Fleet (runtime)                      │
//! │ - Topics             │                       │  - Registry (device id ─► supervisor) │
//! │ - discovery          │◄──────────────────────│  - StateTracker (sequence-based)      │
//! │ - StatusSink         │ connectivity/failures │  - SubscriberSet (per-sub queues)     │
//! └──────────────────────┘                       └───────┬───────────────┬───────────────┘
//!                                                        ▼               ▼
//!                                                 ┌───────────────┐ ┌───────────────┐
//!                                                 │DeviceSupervisor│ │DeviceSupervisor│
//!                                                 │ CommandQueue  │ │ CommandQueue  │
//!                                                 │ CommandRunner │ │ CommandRunner │
//!                                                 │ StatusReporter│ │ StatusReporter│
//!                                                 └──────┬────────┘ └──────┬────────┘
//!                                                        │ Transport / Connection / Session
//!                                                        ▼                 ▼
//!                                                     vehicle A         vehicle B
//!
//! every component ──publish(Event)──► Bus (broadcast) ──► subscriber_listener
//!                                                          ├─► StateTracker
//!                                                          └─► SubscriberSet ─► LogWriter, ...
//! ```
//!
//! ### Device lifecycle
//! ```text
//! loop {
//!   Idle ── wait for the first command (or queue close / cancel ─► exit)
//!   Connecting ── Transport::connect(address)
//!   │     └─ Err ─► Disconnected ─► offline, backoff, command retained
//!   Bootstrapping ── wake session ─► WakeUp ─► full session
//!   │     └─ Err ─► Disconnected ─► close, offline, backoff, command retained
//!   Active ── online; run commands in FIFO order until the link drops
//!   │     ├─ command Err ─► requeue at the back, or report after max attempts
//!   │     └─ link lost  ─► Disconnected
//!   close connection, offline
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Fleet**         | Add, remove and stop supervised devices.                      | [`Fleet`], [`FleetBuilder`], [`DeviceHandle`] |
//! | **Commands**      | Units of work executed against an authorized session.         | [`Command`], [`Operation`], [`OpFn`]        |
//! | **Vehicle link**  | Capabilities the application provides (BLE, protocol).        | [`Transport`], [`Connection`], [`Session`]  |
//! | **Bus bridge**    | Topic routing, discovery, status projection.                  | [`BusBridge`], [`BusClient`], [`Topics`]    |
//! | **Policies**      | Reconnect backoff and command retry bound.                    | [`BackoffPolicy`], [`RetryPolicy`]          |
//! | **Events**        | Observe the runtime (logging, custom subscribers).            | [`Event`], [`Subscribe`], [`LogWriter`]     |
//! | **Configuration** | TOML file with bus, supervisor and device sections.           | [`FleetConfig`], [`SupervisorConfig`]       |
//! | **Errors**        | Typed errors per concern.                                     | [`RuntimeError`], [`LinkError`], ...        |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use fleetvisor::{
//!     Command, Connection, Credential, DeviceDescriptor, Fleet, LinkError, SupervisorConfig,
//!     Transport,
//! };
//!
//! struct Unreachable;
//!
//! #[async_trait]
//! impl Transport for Unreachable {
//!     async fn connect(
//!         &self,
//!         address: &str,
//!         _ctx: CancellationToken,
//!     ) -> Result<Box<dyn Connection>, LinkError> {
//!         Err(LinkError::Connect { address: address.into(), reason: "out of range".into() })
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SupervisorConfig::default();
//!     cfg.grace = Duration::from_secs(1);
//!
//!     let fleet = Fleet::builder(cfg, Arc::new(Unreachable)).build();
//!     let car = fleet
//!         .add_device(DeviceDescriptor::new("model3", "5YJ3E1EA7KF000001", Credential::from_bytes(b"key".to_vec())))
//!         .await?;
//!
//!     car.push(Command::from_fn("noop", |_session, _ctx| async { Ok(()) })).await?;
//!     fleet.stop().await?;
//!     Ok(())
//! }
//! ```
mod bridge;
mod commands;
mod config;
mod core;
mod device;
mod error;
mod events;
mod link;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use bridge::topics;
pub use bridge::{
    BusBridge, BusClient, DiscoveryMessage, EntityConfig, EntityDevice, LastWill, Topics,
    VehicleCommand, VehicleOperation, device_discovery,
};
pub use commands::{
    Command, CommandReceiver, CommandSender, OpFn, Operation, OperationRef, TryPushError,
    command_queue,
};
pub use config::{BusSection, DeviceEntry, FleetConfig, SupervisorSection};
pub use core::{
    CommandRunner, ConnectionState, Connectivity, DeviceHandle, DeviceSupervisor,
    DeviceSupervisorParams, FailureReport, Fleet, FleetBuilder, NullSink, StateTracker,
    StatusReporter, StatusSink, SupervisorConfig, SupervisorExit,
};
pub use device::{Credential, DeviceDescriptor};
pub use error::{
    BusError, CommandError, ConfigError, InboundError, LinkError, QueueError, RuntimeError,
};
pub use events::{Bus, Event, EventKind};
pub use link::{Action, Connection, Domain, FULL_DOMAINS, Session, SessionRef, Transport, WAKE_DOMAINS};
pub use policies::{BackoffPolicy, JitterPolicy, Retry, RetryPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
