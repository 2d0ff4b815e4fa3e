//! # Function-backed operation (`OpFn`)
//!
//! [`OpFn`] wraps a closure `F: Fn(SessionRef, CancellationToken) -> Fut`, producing a
//! fresh future per attempt. Retries therefore never observe state mutated by an
//! earlier attempt; shared state has to be an explicit `Arc<...>` inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use fleetvisor::{Action, CommandError, OpFn, OperationRef, SessionRef};
//!
//! let op: OperationRef = OpFn::arc("charge_start", |session: SessionRef, ctx: CancellationToken| async move {
//!     session.execute(Action::StartCharging, ctx).await?;
//!     Ok::<_, CommandError>(())
//! });
//!
//! assert_eq!(op.name(), "charge_start");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::commands::operation::Operation;
use crate::error::CommandError;
use crate::link::SessionRef;

/// Function-backed operation.
pub struct OpFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> OpFn<F> {
    /// Creates a new function-backed operation.
    ///
    /// Prefer [`OpFn::arc`] when you immediately need an [`OperationRef`](crate::OperationRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the operation and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Operation for OpFn<F>
where
    F: Fn(SessionRef, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, session: SessionRef, ctx: CancellationToken) -> Result<(), CommandError> {
        (self.f)(session, ctx).await
    }
}
