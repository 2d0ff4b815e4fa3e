//! # Run a single attempt of a command.
//!
//! [`CommandRunner::execute`] runs one attempt of a [`Command`] against the live
//! session, publishes its lifecycle to the [`Bus`], and applies the [`RetryPolicy`]
//! on failure.
//!
//! ## Event flow
//! ```text
//! Success:
//!   CommandStarting → op.run() → Ok  → CommandSucceeded
//!
//! Failure (attempts left):
//!   CommandStarting → op.run() → Err → CommandFailed → CommandRequeued
//!                                                    └─ queue full: spawned push
//!                                                       (closed meanwhile → CommandExhausted + report)
//!
//! Failure (exhausted or queue closed):
//!   CommandStarting → op.run() → Err → CommandFailed → CommandExhausted
//!                                                    → StatusSink::command_failed
//!
//! Cancellation:
//!   CommandStarting → runtime token cancelled → CommandFailed (not retried, not reported)
//! ```
//!
//! ## Rules
//! - Every error is returned to the caller; the supervisor treats it as a lost link.
//! - Only the runtime token skips the retry policy. An operation that reports
//!   `Canceled` on its own is retried like any other failure.
//! - Each attempt gets a **child token**; cancelling it does not affect the device.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    commands::{Command, CommandSender},
    core::reporter::{FailureReport, StatusReporter, StatusSink},
    error::CommandError,
    events::{Bus, Event, EventKind},
    link::SessionRef,
    policies::{Retry, RetryPolicy},
};

/// Executes commands for one device.
pub struct CommandRunner {
    device: Arc<str>,
    retry: RetryPolicy,
    requeue: CommandSender,
    bus: Bus,
}

impl CommandRunner {
    /// Creates a runner that requeues failed commands through `requeue`.
    pub fn new(device: Arc<str>, retry: RetryPolicy, requeue: CommandSender, bus: Bus) -> Self {
        Self {
            device,
            retry,
            requeue,
            bus,
        }
    }

    /// Runs one attempt of `cmd`.
    pub async fn execute(
        &self,
        cmd: Command,
        session: &SessionRef,
        reporter: &StatusReporter,
        parent: &CancellationToken,
    ) -> Result<(), CommandError> {
        let name: Arc<str> = Arc::from(cmd.name());
        let attempt = cmd.attempts().saturating_add(1);
        self.publish(EventKind::CommandStarting, &name, attempt, None);

        let child = parent.child_token();
        let res = tokio::select! {
            biased;
            _ = parent.cancelled() => Err(CommandError::Canceled),
            res = cmd.operation().run(Arc::clone(session), child.clone()) => res,
        };
        child.cancel();

        let err = match res {
            Ok(()) => {
                self.publish(EventKind::CommandSucceeded, &name, attempt, None);
                return Ok(());
            }
            Err(e) => e,
        };

        let reason = err.to_string();
        self.publish(EventKind::CommandFailed, &name, attempt, Some(reason.as_str()));
        if parent.is_cancelled() {
            return Err(err);
        }

        match self.retry.retry(cmd, &self.requeue) {
            Retry::Requeued => {
                self.publish(EventKind::CommandRequeued, &name, attempt, None);
            }
            Retry::Deferred(cmd) => {
                self.publish(EventKind::CommandRequeued, &name, attempt, None);
                self.requeue_later(cmd, name, reason, reporter.sink());
            }
            Retry::Exhausted(cmd) | Retry::Closed(cmd) => {
                let report = FailureReport {
                    command: name.to_string(),
                    attempts: cmd.attempts(),
                    error: reason,
                };
                give_up(&self.bus, &self.device, reporter.sink().as_ref(), &report).await;
            }
        }
        Err(err)
    }

    /// Pushes `cmd` once the queue has room; reports it if the queue closes first.
    fn requeue_later(
        &self,
        cmd: Command,
        name: Arc<str>,
        reason: String,
        sink: Arc<dyn StatusSink>,
    ) {
        let queue = self.requeue.clone();
        let bus = self.bus.clone();
        let device = Arc::clone(&self.device);
        let attempts = cmd.attempts();

        tokio::spawn(async move {
            if let Err(e) = queue.push(cmd).await {
                warn!(device = %device, command = %name, attempts, error = %e, "deferred requeue dropped");
                let report = FailureReport {
                    command: name.to_string(),
                    attempts,
                    error: reason,
                };
                give_up(&bus, &device, sink.as_ref(), &report).await;
            }
        });
    }

    fn publish(&self, kind: EventKind, name: &Arc<str>, attempt: u32, reason: Option<&str>) {
        let mut ev = Event::new(kind)
            .with_device(Arc::clone(&self.device))
            .with_command(Arc::clone(name))
            .with_attempt(attempt);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
    }
}

/// Publishes `CommandExhausted` and hands the report to the sink.
async fn give_up(bus: &Bus, device: &Arc<str>, sink: &dyn StatusSink, report: &FailureReport) {
    bus.publish(
        Event::new(EventKind::CommandExhausted)
            .with_device(Arc::clone(device))
            .with_command(report.command.as_str())
            .with_attempt(report.attempts)
            .with_reason(report.error.as_str()),
    );
    sink.command_failed(device, report).await;
}
