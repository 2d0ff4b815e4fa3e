//! # Device registry: owns the running supervisors.
//!
//! ```text
//! Fleet::add_device    ─► Registry::spawn(handle, supervisor)    ─► tokio::spawn(run(child token))
//! Fleet::remove_device ─► Registry::remove(id)                   ─► close queue, cancel, join
//! Fleet::stop          ─► Registry::close_all(grace)             ─► close queues, cancel, join all
//! ```
//!
//! ## Rules
//! - The registry owns every handle (JoinHandle + DeviceHandle + CancellationToken).
//! - At most one supervisor per logical id.
//! - Every joined supervisor produces exactly one `DeviceRemoved` event; supervisors
//!   aborted after the grace period produce none.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::handle::DeviceHandle;
use crate::core::supervisor::{DeviceSupervisor, SupervisorExit};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// Handle to a running device supervisor.
struct Handle {
    join: JoinHandle<SupervisorExit>,
    device: DeviceHandle,
    cancel: CancellationToken,
}

impl Handle {
    fn stop(&self) {
        self.device.close();
        self.cancel.cancel();
    }
}

/// Registry of running device supervisors.
pub struct Registry {
    devices: RwLock<HashMap<String, Handle>>,
    bus: Bus,
    runtime_token: CancellationToken,
}

impl Registry {
    pub fn new(bus: Bus, runtime_token: CancellationToken) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            bus,
            runtime_token,
        }
    }

    /// Spawns `supervisor` under a child of the runtime token.
    ///
    /// Fails with [`RuntimeError::DuplicateDevice`] if the id is already registered.
    pub async fn spawn(
        &self,
        device: DeviceHandle,
        supervisor: DeviceSupervisor,
    ) -> Result<(), RuntimeError> {
        let id = device.id().to_string();
        let mut devices = self.devices.write().await;
        if devices.contains_key(&id) {
            return Err(RuntimeError::DuplicateDevice { id });
        }

        let cancel = self.runtime_token.child_token();
        let token = cancel.clone();
        let join = tokio::spawn(async move { supervisor.run(token).await });
        devices.insert(
            id.clone(),
            Handle {
                join,
                device,
                cancel,
            },
        );
        drop(devices);

        self.bus
            .publish(Event::new(EventKind::DeviceAdded).with_device(id));
        Ok(())
    }

    /// Stops and joins the supervisor of `id`.
    pub async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        let handle = self.devices.write().await.remove(id);
        match handle {
            Some(handle) => {
                handle.stop();
                self.join_and_report(id, handle.join).await;
                Ok(())
            }
            None => Err(RuntimeError::UnknownDevice { id: id.to_string() }),
        }
    }

    /// Stops every supervisor and joins them until `grace` runs out.
    ///
    /// Returns the sorted ids of supervisors that did not exit in time; those are aborted.
    pub async fn close_all(&self, grace: Duration) -> Vec<String> {
        let handles: Vec<(String, Handle)> = {
            let mut devices = self.devices.write().await;
            devices.drain().collect()
        };

        for (_, h) in &handles {
            h.stop();
        }

        let deadline = Instant::now() + grace;
        let mut stuck = Vec::new();
        for (id, mut h) in handles {
            match time::timeout_at(deadline, &mut h.join).await {
                Ok(joined) => self.report_removed(&id, joined),
                Err(_elapsed) => {
                    h.join.abort();
                    stuck.push(id);
                }
            }
        }
        stuck.sort_unstable();
        stuck
    }

    /// Handle of a registered device.
    pub async fn get(&self, id: &str) -> Option<DeviceHandle> {
        self.devices.read().await.get(id).map(|h| h.device.clone())
    }

    /// Returns the sorted list of registered device ids.
    pub async fn list(&self) -> Vec<String> {
        let devices = self.devices.read().await;
        let mut ids: Vec<String> = devices.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Awaits the join handle and always publishes `DeviceRemoved`.
    async fn join_and_report(&self, id: &str, join: JoinHandle<SupervisorExit>) {
        let joined = join.await;
        self.report_removed(id, joined);
    }

    fn report_removed(&self, id: &str, joined: Result<SupervisorExit, JoinError>) {
        let reason = match joined {
            Ok(exit) => exit.as_str(),
            Err(_) => "supervisor_panic",
        };
        self.bus.publish(
            Event::new(EventKind::DeviceRemoved)
                .with_device(id)
                .with_reason(reason),
        );
    }
}
