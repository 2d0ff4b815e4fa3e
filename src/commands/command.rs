use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::commands::{OpFn, Operation, OperationRef};
use crate::error::CommandError;
use crate::link::SessionRef;

/// A unit of work waiting to run against a device session.
///
/// Carries its attempt counter through requeues; the attempt bound itself is
/// process wide and lives in [`RetryPolicy`](crate::RetryPolicy).
pub struct Command {
    op: OperationRef,
    attempts: u32,
}

impl Command {
    /// Wraps an operation; the attempt counter starts at 0.
    pub fn new(op: OperationRef) -> Self {
        Self { op, attempts: 0 }
    }

    /// Shorthand for `Command::new(OpFn::arc(name, f))`.
    pub fn from_fn<F, Fut>(name: &'static str, f: F) -> Self
    where
        F: Fn(SessionRef, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        Self::new(OpFn::arc(name, f))
    }

    pub fn name(&self) -> &str {
        self.op.name()
    }

    /// Number of failed attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn operation(&self) -> &dyn Operation {
        self.op.as_ref()
    }

    pub(crate) fn record_failure(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }
}

impl<O: Operation> From<Arc<O>> for Command {
    fn from(op: Arc<O>) -> Self {
        Self::new(op)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("attempts", &self.attempts)
            .finish()
    }
}
