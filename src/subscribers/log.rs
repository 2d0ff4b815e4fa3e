//! # LogWriter: runtime events as `tracing` records.
//!
//! Renders every [`Event`] with structured fields. Install any `tracing`
//! subscriber (e.g. `tracing_subscriber::fmt`) to see the output.
//!
//! | Level   | Events |
//! |---------|--------|
//! | `debug` | `StateChanged`, `CommandStarting`, `CommandSucceeded` |
//! | `info`  | device added/removed/online/offline, supervisor stopped, shutdown |
//! | `warn`  | `CommandFailed`, `CommandRequeued`, `BackoffScheduled`, `SubscriberOverflow` |
//! | `error` | `CommandExhausted`, `GraceExceeded`, `SubscriberPanicked` |

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Logging subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let device = e.device.as_deref().unwrap_or("-");
        let command = e.command.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::StateChanged => {
                let state = e.state.map(|s| s.as_str()).unwrap_or("-");
                debug!(seq = e.seq, device, state, reason, "state changed");
            }
            EventKind::DeviceOnline => info!(device, "device online"),
            EventKind::DeviceOffline => info!(device, "device offline"),
            EventKind::DeviceAdded => info!(device, "device added"),
            EventKind::DeviceRemoved => info!(device, reason, "device removed"),
            EventKind::SupervisorStopped => info!(device, reason, "supervisor stopped"),
            EventKind::BackoffScheduled => warn!(
                device,
                failures = e.attempt,
                delay_ms = e.delay_ms,
                reason,
                "reconnect scheduled"
            ),
            EventKind::CommandStarting => {
                debug!(device, command, attempt = e.attempt, "command starting");
            }
            EventKind::CommandSucceeded => {
                debug!(device, command, attempt = e.attempt, "command succeeded");
            }
            EventKind::CommandFailed => {
                warn!(device, command, attempt = e.attempt, reason, "command failed");
            }
            EventKind::CommandRequeued => {
                warn!(device, command, attempts = e.attempt, "command requeued");
            }
            EventKind::CommandExhausted => {
                error!(device, command, attempts = e.attempt, reason, "command gave up");
            }
            EventKind::ShutdownRequested => info!(reason, "shutdown requested"),
            EventKind::AllStoppedWithin => info!("all supervisors stopped within grace"),
            EventKind::GraceExceeded => error!(stuck = reason, "shutdown grace exceeded"),
            EventKind::SubscriberOverflow => warn!(subscriber = device, reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => error!(subscriber = device, reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
