//! # Status reporter: connectivity and failure projection.
//!
//! Each device supervisor owns one [`StatusReporter`]. It turns state machine
//! transitions into externally visible notifications:
//!
//! ```text
//! DeviceSupervisor ──on_online()/on_offline()──► StatusReporter
//!                                                   ├─► StatusSink::connectivity_changed   (deduplicated)
//!                                                   ├─► watch::Sender<Connectivity>        (DeviceHandle::connectivity)
//!                                                   └─► Bus: DeviceOnline / DeviceOffline
//! runner ──command_failed(report)──────────────► StatusSink::command_failed
//! ```
//!
//! ## Rules
//! - Consecutive notifications never repeat the same value.
//! - The first notification is always delivered (there is no "previous" value).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use crate::core::Connectivity;
use crate::events::{Bus, Event, EventKind};

/// A command that ran out of attempts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Command name.
    pub command: String,
    /// Attempts made.
    pub attempts: u32,
    /// Last error.
    pub error: String,
}

/// Receives connectivity changes and failure reports of every device.
///
/// Implemented by [`BusBridge`](crate::BusBridge); tests use recording sinks.
#[async_trait]
pub trait StatusSink: Send + Sync + 'static {
    /// Called when a device's connectivity changes.
    async fn connectivity_changed(&self, device: &str, status: Connectivity);

    /// Called when a command is given up on.
    async fn command_failed(&self, device: &str, report: &FailureReport);
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

#[async_trait]
impl StatusSink for NullSink {
    async fn connectivity_changed(&self, _device: &str, _status: Connectivity) {}

    async fn command_failed(&self, _device: &str, _report: &FailureReport) {}
}

/// Per-device connectivity projection.
pub struct StatusReporter {
    device: Arc<str>,
    last: Option<Connectivity>,
    sink: Arc<dyn StatusSink>,
    watch: watch::Sender<Connectivity>,
    bus: Bus,
}

impl StatusReporter {
    pub fn new(
        device: Arc<str>,
        sink: Arc<dyn StatusSink>,
        watch: watch::Sender<Connectivity>,
        bus: Bus,
    ) -> Self {
        Self {
            device,
            last: None,
            sink,
            watch,
            bus,
        }
    }

    /// Last value announced, if any.
    pub fn last(&self) -> Option<Connectivity> {
        self.last
    }

    pub async fn on_online(&mut self) {
        self.announce(Connectivity::Online).await;
    }

    pub async fn on_offline(&mut self) {
        self.announce(Connectivity::Offline).await;
    }

    /// Forwards a failure report to the sink.
    pub async fn command_failed(&self, report: &FailureReport) {
        self.sink.command_failed(&self.device, report).await;
    }

    /// Sink for reports made after the reporter itself is gone.
    pub fn sink(&self) -> Arc<dyn StatusSink> {
        Arc::clone(&self.sink)
    }

    async fn announce(&mut self, status: Connectivity) {
        if self.last == Some(status) {
            return;
        }
        self.last = Some(status);

        self.watch.send_replace(status);
        let kind = match status {
            Connectivity::Online => EventKind::DeviceOnline,
            Connectivity::Offline => EventKind::DeviceOffline,
        };
        self.bus
            .publish(Event::new(kind).with_device(Arc::clone(&self.device)));
        self.sink.connectivity_changed(&self.device, status).await;
    }
}
