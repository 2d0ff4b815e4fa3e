//! # Operation abstraction.
//!
//! An [`Operation`] is anything expressible against an authorized [`Session`](crate::Session).
//! It has a stable [`name`](Operation::name) (used in logs and failure reports) and an
//! async [`run`](Operation::run) that receives the live session and a [`CancellationToken`].
//!
//! Operations may run more than once (see [`RetryPolicy`](crate::RetryPolicy)), so `run`
//! takes `&self` and must not consume state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::CommandError;
use crate::link::SessionRef;

/// Shared handle to an operation.
pub type OperationRef = Arc<dyn Operation>;

/// # Asynchronous, retryable unit of work against a session.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use fleetvisor::{Action, CommandError, Operation, SessionRef};
///
/// struct Honk;
///
/// #[async_trait]
/// impl Operation for Honk {
///     fn name(&self) -> &str { "ping" }
///
///     async fn run(&self, session: SessionRef, ctx: CancellationToken) -> Result<(), CommandError> {
///         session.execute(Action::Ping, ctx).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Runs the operation once against `session`.
    async fn run(&self, session: SessionRef, ctx: CancellationToken) -> Result<(), CommandError>;
}
