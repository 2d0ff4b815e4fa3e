//! # Vehicle link: transport and session capabilities.
//!
//! The wire protocol (key exchange, domain authorization, framing) and the BLE
//! transport are provided by the embedding application. fleetvisor only needs
//! the capabilities below:
//!
//! ```text
//! Transport::connect(address) ──► Connection
//!                                   ├─ start_session(credential, [Security])            ──► Session
//!                                   │     └─ execute(Action::WakeUp)
//!                                   ├─ start_session(credential, [Security, Infotainment]) ──► Session
//!                                   │     └─ execute(action) ...
//!                                   ├─ closed()   (resolves on terminal link error)
//!                                   └─ close()
//! ```
//!
//! All calls receive the runtime [`CancellationToken`] and should abort promptly
//! once it is cancelled (returning [`LinkError::Canceled`]).

mod domain;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::device::Credential;
use crate::error::LinkError;

pub use domain::{Action, Domain, FULL_DOMAINS, WAKE_DOMAINS};

/// Shared handle to an authorized session.
pub type SessionRef = Arc<dyn Session>;

/// Opens point-to-point links to devices by physical address.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a duplex connection to `address` or fails.
    async fn connect(
        &self,
        address: &str,
        ctx: CancellationToken,
    ) -> Result<Box<dyn Connection>, LinkError>;
}

/// An open duplex link to one device.
///
/// Exclusively owned by the device supervisor for its lifetime.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Establishes an authenticated session restricted to `domains`.
    async fn start_session(
        &self,
        credential: &Credential,
        domains: &[Domain],
        ctx: CancellationToken,
    ) -> Result<SessionRef, LinkError>;

    /// Resolves once the link reports a terminal error (device gone, keepalive lost).
    ///
    /// Must be cancel-safe: the supervisor re-polls it on every loop turn.
    async fn closed(&self) -> LinkError;

    /// Releases the link. Called exactly once per successful `connect`.
    async fn close(&self);
}

/// An authenticated, domain-scoped channel through which actions execute.
#[async_trait]
pub trait Session: Send + Sync {
    /// Executes one action on the vehicle.
    async fn execute(&self, action: Action, ctx: CancellationToken) -> Result<(), LinkError>;
}
