//! # Example: simulated_fleet
//!
//! Runs two simulated vehicles behind an in-memory bus and drives them with the
//! messages a Home Assistant instance would publish.
//!
//! - `model3` is flaky: roughly one connection in three fails.
//! - `modely` rejects `start_charging`, so its failure report shows up on the bus.
//!
//! ## Flow
//! ```text
//! main
//!   ├─► Fleet::builder(cfg, SimulatedRadio).with_status_sink(bridge).with_subscribers([LogWriter])
//!   ├─► add_device(model3), add_device(modely) ─► bridge.attach(...)
//!   ├─► bridge.on_connect()        (discovery, subscriptions, "online")
//!   ├─► bridge.on_message(...)     (a few inbound commands)
//!   ├─► sleep 10s
//!   └─► fleet.stop()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example simulated_fleet
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetvisor::{
    Action, BusBridge, BusClient, BusError, Connection, Credential, DeviceDescriptor, Domain,
    Fleet, LinkError, LogWriter, Session, SessionRef, Subscribe, SupervisorConfig, Transport,
};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Prints every publication instead of talking to a broker.
struct ConsoleBus;

#[async_trait]
impl BusClient for ConsoleBus {
    async fn publish(&self, topic: &str, payload: &[u8], retained: bool) -> Result<(), BusError> {
        let flag = if retained { " (retained)" } else { "" };
        println!("[bus] {topic} = {}{flag}", String::from_utf8_lossy(payload));
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        println!("[bus] subscribed {topic}");
        Ok(())
    }
}

struct SimulatedRadio;

#[async_trait]
impl Transport for SimulatedRadio {
    async fn connect(
        &self,
        address: &str,
        _ctx: CancellationToken,
    ) -> Result<Box<dyn Connection>, LinkError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if address.ends_with("flaky") && rand::rng().random_ratio(1, 3) {
            return Err(LinkError::Connect {
                address: address.to_string(),
                reason: "no advertisement".into(),
            });
        }
        Ok(Box::new(SimulatedLink {
            picky: address.ends_with("picky"),
        }))
    }
}

struct SimulatedLink {
    picky: bool,
}

#[async_trait]
impl Connection for SimulatedLink {
    async fn start_session(
        &self,
        _credential: &Credential,
        _domains: &[Domain],
        _ctx: CancellationToken,
    ) -> Result<SessionRef, LinkError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(Arc::new(SimulatedSession { picky: self.picky }))
    }

    async fn closed(&self) -> LinkError {
        std::future::pending::<()>().await;
        LinkError::Disconnected {
            reason: "unreachable".into(),
        }
    }

    async fn close(&self) {}
}

struct SimulatedSession {
    picky: bool,
}

#[async_trait]
impl Session for SimulatedSession {
    async fn execute(&self, action: Action, _ctx: CancellationToken) -> Result<(), LinkError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.picky && action == Action::StartCharging {
            return Err(LinkError::Rejected {
                reason: "charge port closed".into(),
            });
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. Runtime knobs: short backoff and grace so the demo finishes quickly
    let mut cfg = SupervisorConfig::default();
    cfg.grace = Duration::from_secs(2);
    cfg.backoff = fleetvisor::BackoffPolicy::fixed(Duration::from_millis(500));

    // 2. Bridge doubles as the status sink
    let bridge = Arc::new(BusBridge::new(Arc::new(ConsoleBus), "tesla-ble"));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let fleet = Fleet::builder(cfg, Arc::new(SimulatedRadio))
        .with_status_sink(bridge.clone())
        .with_subscribers(subs)
        .build();

    // 3. Vehicles
    for (id, address) in [("model3", "vin-flaky"), ("modely", "vin-picky")] {
        let key = Credential::from_bytes(format!("{id}-key").into_bytes());
        let handle = fleet
            .add_device(DeviceDescriptor::new(id, address, key))
            .await?;
        bridge.attach(handle, 16).await;
    }
    println!("[bridge] last will: {:?}", bridge.last_will());
    bridge.on_connect().await?;

    // 4. What Home Assistant would send
    let inbound: [(&str, &[u8]); 4] = [
        ("tesla-ble/model3/charging_amps_set", b"11.6"),
        ("tesla-ble/model3/charging_set", b"ON"),
        ("tesla-ble/modely/charging_set", b"on"),
        ("tesla-ble/modely/charging_amps_set", b"99"),
    ];
    for (topic, payload) in inbound {
        if let Err(e) = bridge.on_message(topic, payload).await {
            println!("[bridge] dropped {topic}: {e}");
        }
    }

    // 5. Let the supervisors work, then stop
    tokio::time::sleep(Duration::from_secs(10)).await;
    fleet.stop().await?;

    println!("[main] done.");
    Ok(())
}
