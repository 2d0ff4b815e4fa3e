//! # Bus bridge.
//!
//! - [`BusClient`] the pub/sub capability (MQTT in deployment), provided by the application
//! - [`BusBridge`] routes inbound topics to device queues and projects status outward
//! - [`Topics`] topic layout
//! - [`VehicleCommand`] the commands accepted from the bus
//! - [`device_discovery`] Home Assistant discovery payloads

mod bus_bridge;
mod client;
mod discovery;
mod inbound;
pub mod topics;

pub use bus_bridge::BusBridge;
pub use client::{BusClient, LastWill};
pub use discovery::{DiscoveryMessage, EntityConfig, EntityDevice, device_discovery};
pub use inbound::{VehicleCommand, VehicleOperation};
pub use topics::Topics;
