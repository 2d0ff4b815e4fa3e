//! # Runtime event subscribers.
//!
//! ```text
//! DeviceSupervisor ── publish(Event) ──► Bus ──► Fleet listener ──► SubscriberSet::emit
//!                                                                      ├──► LogWriter (tracing)
//!                                                                      ├──► StateTracker
//!                                                                      └──► custom Subscribe impls
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] per-subscriber queues and panic isolation
//! - [`LogWriter`] renders events through `tracing`

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
