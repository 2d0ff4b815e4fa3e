//! # Device state tracker with sequence-based ordering.
//!
//! Maintains the last known [`ConnectionState`] of every device and whether its
//! supervisor is still running, using event sequence numbers to handle
//! out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! DeviceSupervisor ──► Bus ──► subscriber_listener() ──► SubscriberSet ──► StateTracker::update()
//!                                                                               │
//!                                                                               ▼
//!                                                                  HashMap<String, DeviceState>
//!                                                               (id → {seq, state, running})
//! ```
//!
//! ## Rules
//! - `DeviceAdded` marks a supervisor running; `SupervisorStopped` / `DeviceRemoved` stop it
//! - `StateChanged` records the state entered
//! - Events with `seq <= last_seq` are **rejected** (stale)
//! - Reads are **eventually consistent**

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::ConnectionState;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

#[derive(Debug, Clone)]
struct DeviceState {
    last_seq: u64,
    state: Option<ConnectionState>,
    running: bool,
}

/// Thread-safe tracker of device supervisors.
///
/// Registered by the [`Fleet`](crate::Fleet) as a subscriber; backs
/// [`Fleet::device_state`](crate::Fleet::device_state).
pub struct StateTracker {
    state: RwLock<HashMap<String, DeviceState>>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies `ev` if it is newer than the last event seen for its device.
    ///
    /// Returns `true` if the event changed tracked state.
    pub async fn update(&self, ev: &Event) -> bool {
        let device = match ev.kind {
            EventKind::DeviceAdded
            | EventKind::DeviceRemoved
            | EventKind::SupervisorStopped
            | EventKind::StateChanged => match ev.device.as_deref() {
                Some(d) => d,
                None => return false,
            },
            _ => return false,
        };

        let mut state = self.state.write().await;
        let entry = state.entry(device.to_string()).or_insert(DeviceState {
            last_seq: 0,
            state: None,
            running: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;

        match ev.kind {
            EventKind::DeviceAdded => entry.running = true,
            EventKind::DeviceRemoved | EventKind::SupervisorStopped => entry.running = false,
            EventKind::StateChanged => {
                if ev.state.is_some() {
                    entry.state = ev.state;
                }
            }
            _ => {}
        }
        true
    }

    /// Returns the sorted ids of devices whose supervisor is still running.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut running: Vec<String> = state
            .iter()
            .filter(|(_, ds)| ds.running)
            .map(|(id, _)| id.clone())
            .collect();
        running.sort_unstable();
        running
    }

    /// Last connection state reported for `device`.
    pub async fn state(&self, device: &str) -> Option<ConnectionState> {
        self.state.read().await.get(device).and_then(|ds| ds.state)
    }

    pub async fn is_running(&self, device: &str) -> bool {
        self.state
            .read()
            .await
            .get(device)
            .map(|ds| ds.running)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Subscribe for StateTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "state_tracker"
    }

    fn queue_capacity(&self) -> usize {
        2048
    }
}
