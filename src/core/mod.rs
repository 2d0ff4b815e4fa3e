//! Runtime core: device supervision and fleet lifecycle.
//!
//! The public entry point is [`Fleet`], built with [`FleetBuilder`]. It spawns one
//! [`DeviceSupervisor`] per device and hands out [`DeviceHandle`]s.
//!
//! Internal modules:
//! - `supervisor`: per-device connection state machine;
//! - `bootstrap`: two-phase session authorization;
//! - `runner`: executes one command attempt and applies the retry policy;
//! - `reporter`: deduplicated connectivity and failure projection;
//! - `registry`: owns the running supervisors;
//! - `tracker`: last known state per device (event subscriber);
//! - `shutdown`: OS signal handling.

mod bootstrap;
mod builder;
mod config;
mod fleet;
mod handle;
mod registry;
mod reporter;
mod runner;
mod shutdown;
mod state;
mod supervisor;
mod tracker;

pub use builder::FleetBuilder;
pub use config::SupervisorConfig;
pub use fleet::Fleet;
pub use handle::DeviceHandle;
pub use reporter::{FailureReport, NullSink, StatusReporter, StatusSink};
pub use runner::CommandRunner;
pub use state::{ConnectionState, Connectivity};
pub use supervisor::{DeviceSupervisor, DeviceSupervisorParams, SupervisorExit};
pub use tracker::StateTracker;
