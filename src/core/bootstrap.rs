//! Two-phase session bootstrap.
//!
//! A sleeping vehicle only answers its security controller, so the link is
//! authorized in two steps:
//!
//! ```text
//! start_session([Security]) ─► execute(WakeUp) ─► start_session([Security, Infotainment])
//!         │ err                      │ err                     │ err
//!         └──────────────────────────┴─────────────────────────┴──► LinkError (Disconnected)
//! ```
//!
//! The restricted session is dropped once the full one is established.

use tokio_util::sync::CancellationToken;

use crate::device::Credential;
use crate::error::LinkError;
use crate::link::{Action, Connection, FULL_DOMAINS, SessionRef, WAKE_DOMAINS};

/// Wakes the vehicle and returns a fully authorized session.
pub async fn bootstrap(
    conn: &dyn Connection,
    credential: &Credential,
    ctx: &CancellationToken,
) -> Result<SessionRef, LinkError> {
    let wake = conn
        .start_session(credential, WAKE_DOMAINS, ctx.clone())
        .await?;
    wake.execute(Action::WakeUp, ctx.clone()).await?;
    drop(wake);

    conn.start_session(credential, FULL_DOMAINS, ctx.clone())
        .await
}
