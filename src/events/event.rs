//! # Runtime events emitted by the fleet and its device supervisors.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Connection events**: state machine transitions, backoff, online/offline
//! - **Command events**: attempt lifecycle, requeue, exhaustion
//! - **Management events**: devices added to / removed from the fleet
//! - **Runtime events**: shutdown, grace, subscriber health
//!
//! The [`Event`] struct carries additional metadata such as timestamps, device id,
//! command name, attempts and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use fleetvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CommandFailed)
//!     .with_device("model3")
//!     .with_command("set_charging_amps")
//!     .with_reason("boom")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::CommandFailed);
//! assert_eq!(ev.device.as_deref(), Some("model3"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::ConnectionState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `device` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `device` (subscriber name), `reason`.
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or explicit shutdown).
    ShutdownRequested,

    /// All device supervisors stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some supervisors did not stop in time.
    GraceExceeded,

    // === Management events ===
    /// A device supervisor was spawned.
    ///
    /// Sets: `device`.
    DeviceAdded,

    /// A device supervisor was joined and removed from the fleet.
    ///
    /// Sets: `device`, `reason` (exit reason).
    DeviceRemoved,

    // === Connection events ===
    /// The connection state machine moved to a new state.
    ///
    /// Sets: `device`, `state`, `reason` (only when entering `Disconnected`).
    StateChanged,

    /// Connectivity crossed into `Active`.
    ///
    /// Sets: `device`.
    DeviceOnline,

    /// Connectivity left `Active` (or the initial offline announcement).
    ///
    /// Sets: `device`.
    DeviceOffline,

    /// A reconnect delay was scheduled after a disconnect.
    ///
    /// Sets: `device`, `attempt` (consecutive failed connections), `delay_ms`, `reason`.
    BackoffScheduled,

    /// The supervisor loop exited (queue closed or runtime cancelled).
    ///
    /// Sets: `device`, `reason`.
    SupervisorStopped,

    // === Command events ===
    /// A command attempt is about to run.
    ///
    /// Sets: `device`, `command`, `attempt` (1-based).
    CommandStarting,

    /// A command attempt succeeded.
    ///
    /// Sets: `device`, `command`, `attempt`.
    CommandSucceeded,

    /// A command attempt failed.
    ///
    /// Sets: `device`, `command`, `attempt`, `reason`.
    CommandFailed,

    /// A failed command was pushed back onto its queue.
    ///
    /// Sets: `device`, `command`, `attempt` (attempts so far).
    CommandRequeued,

    /// A command ran out of attempts (or its queue closed) and was reported as failed.
    ///
    /// Sets: `device`, `command`, `attempt`, `reason`.
    CommandExhausted,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Logical device id (or subscriber name for subscriber events).
    pub device: Option<Arc<str>>,
    /// Command name, if applicable.
    pub command: Option<Arc<str>>,
    /// Connection state entered (for `StateChanged`).
    pub state: Option<ConnectionState>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before the next connection attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            device: None,
            command: None,
            state: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a device id.
    #[inline]
    pub fn with_device(mut self, device: impl Into<Arc<str>>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Attaches a command name.
    #[inline]
    pub fn with_command(mut self, command: impl Into<Arc<str>>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attaches the connection state entered.
    #[inline]
    pub fn with_state(mut self, state: ConnectionState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_device(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_device(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
