//! # Reconnect backoff policy.
//!
//! [`BackoffPolicy`] controls how long a device supervisor waits in `Disconnected`
//! before returning to `Idle`. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay after the first failed connection;
//! - [`BackoffPolicy::factor`] the multiplicative growth per consecutive failure;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The default is a **fixed** one second interval (`factor = 1.0`): vehicles that
//! are out of range are polled at a steady rate rather than increasingly rarely.
//!
//! The delay for failure `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jitter is applied. The base delay is derived purely from `n`, so jitter
//! output never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use fleetvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(4),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(500));
//! assert_eq!(backoff.next(2), Duration::from_secs(2));
//! assert_eq!(backoff.next(9), Duration::from_secs(4));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Reconnect backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failed connection.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = fixed interval).
    pub factor: f64,
    /// Jitter policy to spread reconnects of many vehicles.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Fixed one second interval, 30s cap, no jitter.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// A constant delay with no jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay.max(Duration::from_secs(30)),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay after `failures` consecutive failed connections (0-indexed).
    ///
    /// - `factor == 1.0` keeps the delay constant at `first` (up to `max`).
    /// - `factor > 1.0` grows exponentially up to `max`.
    /// - non-finite or negative intermediate values clamp to `max`.
    pub fn next(&self, failures: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = failures.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}
