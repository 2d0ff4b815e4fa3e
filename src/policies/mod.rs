//! Retry and reconnect policies.
//!
//! ## Contents
//! - [`RetryPolicy`]   how often a failed command is re-submitted
//! - [`BackoffPolicy`] how long a disconnected supervisor waits before reconnecting
//! - [`JitterPolicy`]  randomization of that wait
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { max_attempts, backoff }
//!      └─► core::supervisor::DeviceSupervisor uses:
//!           - retry.retry(cmd, queue) after a failed command
//!           - backoff.next(failures) while Disconnected
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 2 attempts.
//! - `BackoffPolicy::default()` → fixed 1s, no jitter.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::{Retry, RetryPolicy};
