//! # Runtime configuration.
//!
//! [`SupervisorConfig`] holds the knobs shared by every device supervisor of a
//! [`Fleet`](crate::Fleet). It is usually produced by
//! [`FleetConfig::supervisor`](crate::FleetConfig::supervisor) from the TOML file,
//! but can be built in code.
//!
//! ## Sentinel values
//! - `keepalive = None` → no periodic ping while `Active`
//! - `grace = 0s` → do not wait for supervisors on shutdown

use std::time::Duration;

use crate::policies::{BackoffPolicy, RetryPolicy};

/// Runtime configuration shared by all device supervisors.
///
/// ## Field semantics
/// - `grace`: maximum wait for supervisors to stop after shutdown was requested
/// - `queue_capacity`: per-device command queue bound (min 1)
/// - `max_attempts`: total attempts per command, initial one included (min 1)
/// - `bus_capacity`: runtime event bus ring buffer size (min 1)
/// - `backoff`: reconnect delay after a failed or lost connection
/// - `keepalive`: optional ping period while `Active`
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for graceful shutdown.
    ///
    /// Supervisors that did not exit in time are reported through
    /// [`RuntimeError::GraceExceeded`](crate::RuntimeError::GraceExceeded).
    pub grace: Duration,

    /// Capacity of each device's command queue.
    pub queue_capacity: usize,

    /// Maximum number of attempts per command.
    pub max_attempts: u32,

    /// Capacity of the runtime event bus.
    pub bus_capacity: usize,

    /// Reconnect backoff.
    pub backoff: BackoffPolicy,

    /// Keepalive period while `Active` (`None` = disabled).
    pub keepalive: Option<Duration>,
}

impl SupervisorConfig {
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Retry policy derived from `max_attempts`.
    #[inline]
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }

    /// Keepalive period, ignoring a zero duration.
    #[inline]
    pub fn keepalive_period(&self) -> Option<Duration> {
        self.keepalive.filter(|d| !d.is_zero())
    }
}

impl Default for SupervisorConfig {
    /// Defaults:
    /// - `grace = 10s`
    /// - `queue_capacity = 20`
    /// - `max_attempts = 2`
    /// - `bus_capacity = 1024`
    /// - `backoff = BackoffPolicy::default()` (fixed 1s)
    /// - `keepalive = None`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            queue_capacity: 20,
            max_attempts: 2,
            bus_capacity: 1024,
            backoff: BackoffPolicy::default(),
            keepalive: None,
        }
    }
}
