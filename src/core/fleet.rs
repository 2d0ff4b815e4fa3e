//! # Fleet: device supervisors, fan-out delivery and graceful shutdown.
//!
//! The [`Fleet`] owns the runtime event bus, a [`SubscriberSet`], the device
//! [`Registry`] and the shared collaborators (transport, status sink). It spawns
//! one [`DeviceSupervisor`] per device and coordinates shutdown.
//!
//! ## High-level architecture
//! ```text
//! FleetBuilder::build()
//!   - Bus::new(bus_capacity)
//!   - SubscriberSet::new(subscribers + StateTracker)
//!   - subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!
//! add_device(descriptor):
//!   channel(queue_capacity) ─► (CommandSender, CommandReceiver)
//!   watch::channel(Offline) ─► StatusReporter + DeviceHandle
//!   DeviceSupervisor::new(...) ─► Registry::spawn (child CancellationToken)
//!
//! Shutdown path:
//!   run(): OS signal or shutdown()
//!        └─► stop(reason)
//!              ├─ Bus.publish(ShutdownRequested)
//!              ├─ runtime_token.cancel()          → propagates to every supervisor
//!              └─ Registry::close_all(grace):
//!                    ├─ all joined  → Bus.publish(AllStoppedWithin)
//!                    └─ otherwise   → Bus.publish(GraceExceeded), RuntimeError::GraceExceeded
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use fleetvisor::{Connection, Fleet, LinkError, SupervisorConfig, Transport};
//!
//! struct Unreachable;
//!
//! #[async_trait]
//! impl Transport for Unreachable {
//!     async fn connect(&self, address: &str, _ctx: CancellationToken) -> Result<Box<dyn Connection>, LinkError> {
//!         Err(LinkError::Connect { address: address.into(), reason: "out of range".into() })
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fleetvisor::RuntimeError> {
//!     let fleet = Fleet::builder(SupervisorConfig::default(), Arc::new(Unreachable)).build();
//!     assert!(fleet.devices().await.is_empty());
//!     fleet.stop().await
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    commands::queue,
    core::{
        ConnectionState, Connectivity,
        builder::FleetBuilder,
        config::SupervisorConfig,
        handle::DeviceHandle,
        registry::Registry,
        reporter::{StatusReporter, StatusSink},
        runner::CommandRunner,
        shutdown,
        supervisor::{DeviceSupervisor, DeviceSupervisorParams},
        tracker::StateTracker,
    },
    device::DeviceDescriptor,
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    link::Transport,
    subscribers::SubscriberSet,
};

/// Supervises a fleet of devices.
pub struct Fleet {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    tracker: Arc<StateTracker>,
    registry: Registry,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn StatusSink>,
    runtime_token: CancellationToken,
}

impl Fleet {
    /// Starts building a fleet that reaches devices through `transport`.
    pub fn builder(cfg: SupervisorConfig, transport: Arc<dyn Transport>) -> FleetBuilder {
        FleetBuilder::new(cfg, transport)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        tracker: Arc<StateTracker>,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        let runtime_token = CancellationToken::new();
        let registry = Registry::new(bus.clone(), runtime_token.clone());
        Self {
            cfg,
            bus,
            subs,
            tracker,
            registry,
            transport,
            sink,
            runtime_token,
        }
    }

    /// Spawns a supervisor for `descriptor` and returns its handle.
    ///
    /// The supervisor starts in `Idle` and announces `Offline` once.
    pub async fn add_device(&self, descriptor: DeviceDescriptor) -> Result<DeviceHandle, RuntimeError> {
        if self.runtime_token.is_cancelled() {
            return Err(RuntimeError::ShuttingDown);
        }

        let id = descriptor.id_arc();
        let (tx, rx) = queue::channel(self.cfg.queue_capacity_clamped());
        let (status_tx, status_rx) = watch::channel(Connectivity::Offline);

        let reporter = StatusReporter::new(
            Arc::clone(&id),
            Arc::clone(&self.sink),
            status_tx,
            self.bus.clone(),
        );
        let runner = CommandRunner::new(
            Arc::clone(&id),
            self.cfg.retry(),
            tx.clone(),
            self.bus.clone(),
        );
        let supervisor = DeviceSupervisor::new(
            descriptor,
            rx,
            DeviceSupervisorParams {
                transport: Arc::clone(&self.transport),
                runner,
                reporter,
                backoff: self.cfg.backoff,
                keepalive: self.cfg.keepalive_period(),
            },
            self.bus.clone(),
        );

        let handle = DeviceHandle::new(id, tx, status_rx);
        self.registry.spawn(handle.clone(), supervisor).await?;
        Ok(handle)
    }

    /// Stops and joins the supervisor of `id`.
    pub async fn remove_device(&self, id: &str) -> Result<(), RuntimeError> {
        self.registry.remove(id).await
    }

    /// Handle of a supervised device.
    pub async fn device(&self, id: &str) -> Option<DeviceHandle> {
        self.registry.get(id).await
    }

    /// Sorted ids of supervised devices.
    pub async fn devices(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Last connection state reported by `id`'s supervisor (eventually consistent).
    pub async fn device_state(&self, id: &str) -> Option<ConnectionState> {
        self.tracker.state(id).await
    }

    /// Receiver of runtime events published after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Requests shutdown; [`run`](Self::run) then stops every supervisor.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    /// Runs until an OS termination signal or [`shutdown`](Self::shutdown), then stops.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let reason = self.wait_for_stop().await;
        self.stop_with(reason).await
    }

    /// Stops every supervisor immediately, waiting up to the configured grace.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.stop_with("requested").await
    }

    async fn wait_for_stop(&self) -> &'static str {
        tokio::select! {
            _ = self.runtime_token.cancelled() => "requested",
            sig = shutdown::wait_for_shutdown_signal() => match sig {
                Ok(name) => name,
                Err(_) => {
                    self.runtime_token.cancelled().await;
                    "requested"
                }
            },
        }
    }

    async fn stop_with(&self, reason: &'static str) -> Result<(), RuntimeError> {
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        self.runtime_token.cancel();
        self.wait_all_with_grace().await
    }

    /// Joins all supervisors within the configured grace period.
    async fn wait_all_with_grace(&self) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let stuck = self.registry.close_all(grace).await;

        if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            self.bus.publish(
                Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
            );
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }

    /// Forwards bus events to the subscriber set until the bus closes.
    pub(crate) fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
