//! # BusBridge: pub/sub bus ⇄ device handles.
//!
//! ```text
//! bus event loop ──on_connect()──► subscribe <prefix>/<id>/{charging_amps_set,charging_set}
//!                                  publish discovery + device status (retained)
//!                                  publish <prefix>/status "online" (retained)
//!
//! bus event loop ──on_message(topic, payload)──► Topics::parse ─► VehicleCommand::parse
//!                                                 └─► DeviceHandle::push(Command)   (waits when full)
//!
//! StatusReporter ──StatusSink──► <prefix>/<id>/status          (retained)
//!                                <prefix>/<id>/command_failed  (JSON)
//! ```
//!
//! Inbound messages that cannot become commands are logged and dropped. Bus
//! failures are logged and never stop the bridge.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::bridge::client::{BusClient, LastWill};
use crate::bridge::discovery::device_discovery;
use crate::bridge::inbound::{VehicleCommand, VehicleOperation};
use crate::bridge::topics::{COMMAND_FAILED, INBOUND, STATUS, Topics};
use crate::commands::Command;
use crate::config::{BusSection, DEFAULT_DISCOVERY_PREFIX};
use crate::core::{Connectivity, DeviceHandle, FailureReport, StatusSink};
use crate::error::{BusError, InboundError};

const BRIDGE_ONLINE: &str = "online";
const BRIDGE_OFFLINE: &str = "offline";

struct Attached {
    handle: DeviceHandle,
    max_charging_amps: i32,
}

/// Translates between bus topics and device handles.
pub struct BusBridge {
    client: Arc<dyn BusClient>,
    topics: Topics,
    discovery_prefix: String,
    devices: RwLock<HashMap<String, Attached>>,
}

impl BusBridge {
    pub fn new(client: Arc<dyn BusClient>, prefix: &str) -> Self {
        Self {
            client,
            topics: Topics::new(prefix),
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
            devices: RwLock::new(HashMap::new()),
        }
    }

    /// Bridge configured from the `[bus]` section.
    pub fn from_config(client: Arc<dyn BusClient>, bus: &BusSection) -> Self {
        Self::new(client, &bus.prefix).with_discovery_prefix(&bus.discovery_prefix)
    }

    pub fn with_discovery_prefix(mut self, discovery_prefix: &str) -> Self {
        self.discovery_prefix = discovery_prefix.to_string();
        self
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Routes the device's inbound topics to `handle`.
    ///
    /// Attaching the same id again replaces the previous handle.
    pub async fn attach(&self, handle: DeviceHandle, max_charging_amps: i32) {
        let id = handle.id().to_string();
        self.devices.write().await.insert(
            id,
            Attached {
                handle,
                max_charging_amps,
            },
        );
    }

    /// Stops routing to `id`.
    pub async fn detach(&self, id: &str) -> Option<DeviceHandle> {
        self.devices.write().await.remove(id).map(|a| a.handle)
    }

    /// Will to register with the bus client before connecting.
    pub fn last_will(&self) -> LastWill {
        LastWill {
            topic: self.topics.bridge_status(),
            payload: BRIDGE_OFFLINE,
            retained: true,
        }
    }

    /// Call after every (re)connection of the bus client.
    ///
    /// Every step is attempted; the first failure is returned after logging all of them.
    pub async fn on_connect(&self) -> Result<(), BusError> {
        let mut first_err = None;
        let mut note = |res: Result<(), BusError>| {
            if let Err(e) = res {
                warn!(error = %e, label = e.as_label(), "bus setup step failed");
                first_err.get_or_insert(e);
            }
        };

        let devices: Vec<(String, i32, Connectivity)> = {
            let devices = self.devices.read().await;
            let mut list: Vec<_> = devices
                .iter()
                .map(|(id, a)| (id.clone(), a.max_charging_amps, a.handle.connectivity()))
                .collect();
            list.sort_by(|a, b| a.0.cmp(&b.0));
            list
        };

        for (id, max_amps, connectivity) in &devices {
            for value in INBOUND {
                note(self.client.subscribe(&self.topics.device(id, value)).await);
            }

            match device_discovery(&self.topics, &self.discovery_prefix, id, *max_amps) {
                Ok(messages) => {
                    for msg in messages {
                        note(
                            self.client
                                .publish(&msg.topic, msg.payload.as_bytes(), true)
                                .await,
                        );
                    }
                }
                Err(e) => warn!(device = %id, error = %e, "discovery payload not serializable"),
            }

            note(
                self.client
                    .publish(
                        &self.topics.device(id, STATUS),
                        connectivity.as_str().as_bytes(),
                        true,
                    )
                    .await,
            );
        }

        note(
            self.client
                .publish(&self.topics.bridge_status(), BRIDGE_ONLINE.as_bytes(), true)
                .await,
        );
        info!(devices = devices.len(), "bus connected");

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Call for every message received on a subscribed topic.
    ///
    /// Waits while the device queue is full. Rejected messages are logged and returned.
    pub async fn on_message(&self, topic: &str, payload: &[u8]) -> Result<(), InboundError> {
        let res = self.route(topic, payload).await;
        if let Err(e) = &res {
            warn!(
                topic,
                payload = %String::from_utf8_lossy(payload),
                error = %e,
                label = e.as_label(),
                "inbound message dropped"
            );
        }
        res
    }

    async fn route(&self, topic: &str, payload: &[u8]) -> Result<(), InboundError> {
        let (id, value) = self
            .topics
            .parse(topic)
            .ok_or_else(|| InboundError::UnknownTopic(topic.to_string()))?;

        let (handle, max_amps) = {
            let devices = self.devices.read().await;
            let attached = devices
                .get(id)
                .ok_or_else(|| InboundError::UnknownTopic(topic.to_string()))?;
            (attached.handle.clone(), attached.max_charging_amps)
        };

        let command = VehicleCommand::parse(value, payload, max_amps)?;
        let (echo_value, _) = command.echo();
        let op = VehicleOperation::new(
            command,
            self.topics.device(id, echo_value),
            Arc::clone(&self.client),
        );

        debug!(device = id, command = command.name(), "command queued");
        handle.push(Command::from(Arc::new(op))).await?;
        Ok(())
    }

    async fn publish_logged(&self, topic: &str, payload: &[u8], retained: bool) {
        if let Err(e) = self.client.publish(topic, payload, retained).await {
            warn!(topic, error = %e, label = e.as_label(), "publish failed");
        }
    }
}

#[async_trait]
impl StatusSink for BusBridge {
    async fn connectivity_changed(&self, device: &str, status: Connectivity) {
        let topic = self.topics.device(device, STATUS);
        self.publish_logged(&topic, status.as_str().as_bytes(), true)
            .await;
    }

    async fn command_failed(&self, device: &str, report: &FailureReport) {
        let topic = self.topics.device(device, COMMAND_FAILED);
        match serde_json::to_vec(report) {
            Ok(payload) => self.publish_logged(&topic, &payload, false).await,
            Err(e) => warn!(device, error = %e, "failure report not serializable"),
        }
    }
}
