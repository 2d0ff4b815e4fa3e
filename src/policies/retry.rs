//! # Bounded command retry.
//!
//! [`RetryPolicy`] decides what happens to a command whose attempt just failed:
//!
//! ```text
//! attempts += 1
//!   ├─ attempts < max_attempts ─► push to the BACK of the queue ─► Retry::Requeued
//!   ├─ queue full              ─► Retry::Deferred(cmd)  (caller pushes it later)
//!   ├─ attempts ≥ max_attempts ─► Retry::Exhausted(cmd) (caller must report it)
//!   └─ queue closed            ─► Retry::Closed(cmd)    (caller must report it)
//! ```
//!
//! The policy never waits on the queue: the supervisor is the only consumer of
//! its own queue, so waiting for room there could deadlock.

use crate::commands::{Command, CommandSender, TryPushError};

/// Outcome of [`RetryPolicy::retry`].
#[derive(Debug)]
pub enum Retry {
    /// The command is queued for another attempt.
    Requeued,
    /// The queue is full; the caller must push the command without blocking its consumer.
    Deferred(Command),
    /// The command used up all attempts.
    Exhausted(Command),
    /// The queue was closed; the command cannot be retried.
    Closed(Command),
}

/// Bounded-attempt retry policy.
///
/// A command runs at most `max_attempts` times in total (initial attempt included).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    /// Two attempts: the initial one plus a single retry.
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Records a failed attempt and requeues the command if attempts remain.
    pub fn retry(&self, mut cmd: Command, queue: &CommandSender) -> Retry {
        let attempts = cmd.record_failure();
        if attempts >= self.max_attempts {
            return Retry::Exhausted(cmd);
        }

        match queue.try_push(cmd) {
            Ok(()) => Retry::Requeued,
            Err(TryPushError::Closed(cmd)) => Retry::Closed(cmd),
            Err(TryPushError::Full(cmd)) => Retry::Deferred(cmd),
        }
    }
}
