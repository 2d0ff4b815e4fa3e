//! # DeviceSupervisor: single-device connection state machine.
//!
//! Owns the link to one vehicle and drains its command queue:
//! - connects lazily when the first command arrives,
//! - bootstraps sessions (see `core::bootstrap`),
//! - executes commands in FIFO order while `Active`,
//! - tears down and backs off on any failure,
//! - cooperative cancellation via [`CancellationToken`].
//!
//! ## Architecture
//! ```text
//! loop {
//!   Idle           ─► pop() or the retained command      (None → exit QueueClosed)
//!   Connecting     ─► transport.connect(address)         (err → Disconnected)
//!   Bootstrapping  ─► bootstrap(conn, credential)        (err → Disconnected)
//!   Active         ─► reporter.on_online()
//!                     run retained command first
//!                     select! {
//!                       cancelled          → close, offline, exit
//!                       conn.closed()      → Disconnected
//!                       keepalive tick     → Ping (err → Disconnected)
//!                       pop() = Some(cmd)  → runner.execute (err → Disconnected)
//!                       pop() = None       → close, offline, exit
//!                     }
//!   Disconnected   ─► conn.close(), reporter.on_offline()
//!                     publish BackoffScheduled, sleep(backoff.next(failures))
//! }
//! ```
//!
//! ## Rules
//! - The command that triggered a connection is never lost to a failed connect or
//!   bootstrap; it is retained for the next attempt.
//! - A retained command still held when the supervisor exits is published as
//!   [`EventKind::CommandExhausted`] with the exit reason.
//! - The consecutive failure counter resets once `Active` is reached.
//! - Every transition is published as [`EventKind::StateChanged`].

use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    commands::{Command, CommandReceiver},
    core::{
        ConnectionState, bootstrap::bootstrap, reporter::StatusReporter, runner::CommandRunner,
    },
    device::DeviceDescriptor,
    events::{Bus, Event, EventKind},
    link::{Action, Connection, SessionRef, Transport},
    policies::BackoffPolicy,
};

/// Why a supervisor loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The command queue was closed.
    QueueClosed,
    /// The runtime token was cancelled.
    Cancelled,
}

impl SupervisorExit {
    pub fn as_str(self) -> &'static str {
        match self {
            SupervisorExit::QueueClosed => "queue_closed",
            SupervisorExit::Cancelled => "cancelled",
        }
    }
}

/// Result of one connect → bootstrap → active cycle.
enum Cycle {
    Exit(SupervisorExit),
    Lost(String),
}

/// Collaborators and policies of one device supervisor.
pub struct DeviceSupervisorParams {
    pub transport: Arc<dyn Transport>,
    pub runner: CommandRunner,
    pub reporter: StatusReporter,
    pub backoff: BackoffPolicy,
    pub keepalive: Option<Duration>,
}

/// Supervises the link to a single device.
pub struct DeviceSupervisor {
    descriptor: DeviceDescriptor,
    device: Arc<str>,
    queue: CommandReceiver,
    transport: Arc<dyn Transport>,
    runner: CommandRunner,
    reporter: StatusReporter,
    backoff: BackoffPolicy,
    keepalive: Option<Duration>,
    bus: Bus,
    /// Command that triggered the current connection attempt.
    pending: Option<Command>,
    /// Consecutive cycles that ended without reaching `Active`, or lost it.
    failures: u32,
}

impl DeviceSupervisor {
    pub fn new(
        descriptor: DeviceDescriptor,
        queue: CommandReceiver,
        params: DeviceSupervisorParams,
        bus: Bus,
    ) -> Self {
        let device = descriptor.id_arc();
        Self {
            descriptor,
            device,
            queue,
            transport: params.transport,
            runner: params.runner,
            reporter: params.reporter,
            backoff: params.backoff,
            keepalive: params.keepalive,
            bus,
            pending: None,
            failures: 0,
        }
    }

    /// Runs the state machine until the queue is closed or `token` is cancelled.
    ///
    /// Announces `Offline` once at start so a stale retained status is overwritten.
    pub async fn run(mut self, token: CancellationToken) -> SupervisorExit {
        self.reporter.on_offline().await;
        let exit = self.run_loop(&token).await;
        if let Some(cmd) = self.pending.take() {
            self.drop_retained(cmd, exit);
        }
        self.bus.publish(
            Event::new(EventKind::SupervisorStopped)
                .with_device(Arc::clone(&self.device))
                .with_reason(exit.as_str()),
        );
        exit
    }

    async fn run_loop(&mut self, token: &CancellationToken) -> SupervisorExit {
        loop {
            self.enter(ConnectionState::Idle, None);
            let first = match self.next_trigger(token).await {
                Ok(cmd) => cmd,
                Err(exit) => return exit,
            };

            let reason = match self.cycle(first, token).await {
                Cycle::Exit(exit) => return exit,
                Cycle::Lost(reason) => reason,
            };

            if let Some(exit) = self.back_off(&reason, token).await {
                return exit;
            }
        }
    }

    /// Waits in `Idle` for the command that starts the next connection.
    async fn next_trigger(&mut self, token: &CancellationToken) -> Result<Command, SupervisorExit> {
        if token.is_cancelled() {
            return Err(SupervisorExit::Cancelled);
        }
        if self.queue.is_closed() {
            return Err(SupervisorExit::QueueClosed);
        }
        if let Some(cmd) = self.pending.take() {
            return Ok(cmd);
        }

        select! {
            biased;
            _ = token.cancelled() => Err(SupervisorExit::Cancelled),
            next = self.queue.pop() => next.ok_or(SupervisorExit::QueueClosed),
        }
    }

    /// Connecting → Bootstrapping → Active, ending in `Disconnected` or an exit.
    ///
    /// On return the connection (if any) is closed and connectivity is `Offline`.
    async fn cycle(&mut self, first: Command, token: &CancellationToken) -> Cycle {
        self.enter(ConnectionState::Connecting, None);
        let connected = select! {
            biased;
            _ = token.cancelled() => None,
            res = self.transport.connect(self.descriptor.address(), token.child_token()) => Some(res),
        };
        let conn = match connected {
            None => {
                self.pending = Some(first);
                return Cycle::Exit(SupervisorExit::Cancelled);
            }
            Some(Ok(conn)) => conn,
            Some(Err(e)) => {
                self.pending = Some(first);
                let reason = e.to_string();
                self.enter(ConnectionState::Disconnected, Some(reason.as_str()));
                self.reporter.on_offline().await;
                return Cycle::Lost(reason);
            }
        };

        self.enter(ConnectionState::Bootstrapping, None);
        let bootstrapped = select! {
            biased;
            _ = token.cancelled() => None,
            res = bootstrap(conn.as_ref(), self.descriptor.credential(), token) => Some(res),
        };
        let session = match bootstrapped {
            None => {
                self.pending = Some(first);
                self.tear_down(conn).await;
                return Cycle::Exit(SupervisorExit::Cancelled);
            }
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                self.pending = Some(first);
                let reason = e.to_string();
                self.enter(ConnectionState::Disconnected, Some(reason.as_str()));
                self.tear_down(conn).await;
                return Cycle::Lost(reason);
            }
        };

        self.enter(ConnectionState::Active, None);
        self.failures = 0;
        self.reporter.on_online().await;

        let outcome = self.serve(conn.as_ref(), &session, first, token).await;
        drop(session);
        if let Cycle::Lost(reason) = &outcome {
            self.enter(ConnectionState::Disconnected, Some(reason.as_str()));
        }
        self.tear_down(conn).await;
        outcome
    }

    /// The `Active` loop.
    async fn serve(
        &mut self,
        conn: &dyn Connection,
        session: &SessionRef,
        first: Command,
        token: &CancellationToken,
    ) -> Cycle {
        if let Err(e) = self
            .runner
            .execute(first, session, &self.reporter, token)
            .await
        {
            return self.after_failure(e.to_string(), token);
        }

        let mut keepalive = self.keepalive.map(|period| {
            let mut iv = time::interval_at(Instant::now() + period, period);
            iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
            iv
        });

        loop {
            let step = select! {
                biased;
                _ = token.cancelled() => Step::Cancelled,
                err = conn.closed() => Step::Lost(err.to_string()),
                _ = tick(&mut keepalive) => Step::Keepalive,
                next = self.queue.pop() => match next {
                    Some(cmd) => Step::Command(cmd),
                    None => Step::QueueClosed,
                },
            };

            match step {
                Step::Cancelled => return Cycle::Exit(SupervisorExit::Cancelled),
                Step::QueueClosed => return Cycle::Exit(SupervisorExit::QueueClosed),
                Step::Lost(reason) => return Cycle::Lost(reason),
                Step::Keepalive => {
                    let ping = select! {
                        biased;
                        _ = token.cancelled() => None,
                        res = session.execute(Action::Ping, token.child_token()) => Some(res),
                    };
                    match ping {
                        None => return Cycle::Exit(SupervisorExit::Cancelled),
                        Some(Ok(())) => {}
                        Some(Err(e)) => return Cycle::Lost(format!("keepalive: {e}")),
                    }
                }
                Step::Command(cmd) => {
                    if let Err(e) = self
                        .runner
                        .execute(cmd, session, &self.reporter, token)
                        .await
                    {
                        return self.after_failure(e.to_string(), token);
                    }
                }
            }
        }
    }

    fn after_failure(&self, reason: String, token: &CancellationToken) -> Cycle {
        if token.is_cancelled() {
            Cycle::Exit(SupervisorExit::Cancelled)
        } else {
            Cycle::Lost(reason)
        }
    }

    /// Sleeps the reconnect delay; returns `Some` if the supervisor must exit instead.
    async fn back_off(&mut self, reason: &str, token: &CancellationToken) -> Option<SupervisorExit> {
        let delay = self.backoff.next(self.failures);
        self.failures = self.failures.saturating_add(1);

        self.bus.publish(
            Event::new(EventKind::BackoffScheduled)
                .with_device(Arc::clone(&self.device))
                .with_attempt(self.failures)
                .with_delay(delay)
                .with_reason(reason),
        );

        select! {
            biased;
            _ = token.cancelled() => Some(SupervisorExit::Cancelled),
            _ = self.queue.closed() => Some(SupervisorExit::QueueClosed),
            _ = time::sleep(delay) => None,
        }
    }

    fn drop_retained(&self, cmd: Command, exit: SupervisorExit) {
        warn!(
            device = %self.device,
            command = cmd.name(),
            attempts = cmd.attempts(),
            exit = exit.as_str(),
            "retained command dropped"
        );
        self.bus.publish(
            Event::new(EventKind::CommandExhausted)
                .with_device(Arc::clone(&self.device))
                .with_command(cmd.name())
                .with_attempt(cmd.attempts())
                .with_reason(exit.as_str()),
        );
    }

    async fn tear_down(&mut self, conn: Box<dyn Connection>) {
        conn.close().await;
        self.reporter.on_offline().await;
    }

    fn enter(&self, state: ConnectionState, reason: Option<&str>) {
        let mut ev = Event::new(EventKind::StateChanged)
            .with_device(Arc::clone(&self.device))
            .with_state(state);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
    }
}

/// One wake-up of the `Active` loop.
enum Step {
    Cancelled,
    QueueClosed,
    Lost(String),
    Keepalive,
    Command(Command),
}

/// Completes on the next keepalive tick; never completes when keepalive is disabled.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
