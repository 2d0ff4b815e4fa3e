//! # Inbound messages → vehicle commands.
//!
//! ```text
//! charging_amps_set  "12.6"        → SetChargingAmps(13)   echo charging_amps "13"
//! charging_set       "ON" | "off"  → StartCharging / StopCharging   echo charging "ON" / "OFF"
//! ```
//!
//! Payloads that do not parse, or amps outside `0..=max`, are rejected with
//! [`InboundError::InvalidPayload`] and never reach the queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bridge::client::BusClient;
use crate::bridge::topics::{CHARGING, CHARGING_AMPS, CHARGING_AMPS_SET, CHARGING_SET};
use crate::commands::Operation;
use crate::error::{CommandError, InboundError};
use crate::link::{Action, SessionRef};

/// Commands the bridge accepts from the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VehicleCommand {
    SetChargingAmps(i32),
    StartCharging,
    StopCharging,
}

impl VehicleCommand {
    /// Parses the payload of the inbound `value` topic.
    pub fn parse(value: &str, payload: &[u8], max_charging_amps: i32) -> Result<Self, InboundError> {
        match value {
            CHARGING_AMPS_SET => parse_amps(payload, max_charging_amps).map(Self::SetChargingAmps),
            CHARGING_SET => parse_switch(payload).map(|on| {
                if on {
                    Self::StartCharging
                } else {
                    Self::StopCharging
                }
            }),
            other => Err(InboundError::UnknownTopic(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        self.action().name()
    }

    pub fn action(self) -> Action {
        match self {
            Self::SetChargingAmps(amps) => Action::SetChargingAmps(amps),
            Self::StartCharging => Action::StartCharging,
            Self::StopCharging => Action::StopCharging,
        }
    }

    /// Value topic and payload echoed once the command succeeded.
    pub fn echo(self) -> (&'static str, String) {
        match self {
            Self::SetChargingAmps(amps) => (CHARGING_AMPS, amps.to_string()),
            Self::StartCharging => (CHARGING, "ON".to_string()),
            Self::StopCharging => (CHARGING, "OFF".to_string()),
        }
    }
}

fn invalid(payload: &[u8], reason: impl Into<String>) -> InboundError {
    InboundError::InvalidPayload {
        payload: String::from_utf8_lossy(payload).into_owned(),
        reason: reason.into(),
    }
}

fn parse_amps(payload: &[u8], max: i32) -> Result<i32, InboundError> {
    let text = std::str::from_utf8(payload).map_err(|_| invalid(payload, "not UTF-8"))?;
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| invalid(payload, "not a number"))?;
    if !value.is_finite() {
        return Err(invalid(payload, "not a finite number"));
    }

    let rounded = value.round();
    if rounded < 0.0 || rounded > f64::from(max) {
        return Err(invalid(payload, format!("out of range 0..={max}")));
    }
    Ok(rounded as i32)
}

fn parse_switch(payload: &[u8]) -> Result<bool, InboundError> {
    let text = std::str::from_utf8(payload).map_err(|_| invalid(payload, "not UTF-8"))?;
    match text.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(invalid(payload, "expected ON or OFF")),
    }
}

/// Runs a [`VehicleCommand`] and publishes its echo on success.
pub struct VehicleOperation {
    command: VehicleCommand,
    echo_topic: String,
    client: Arc<dyn BusClient>,
}

impl VehicleOperation {
    pub fn new(command: VehicleCommand, echo_topic: String, client: Arc<dyn BusClient>) -> Self {
        Self {
            command,
            echo_topic,
            client,
        }
    }

    pub fn command(&self) -> VehicleCommand {
        self.command
    }
}

#[async_trait]
impl Operation for VehicleOperation {
    fn name(&self) -> &str {
        self.command.name()
    }

    async fn run(&self, session: SessionRef, ctx: CancellationToken) -> Result<(), CommandError> {
        session.execute(self.command.action(), ctx).await?;

        let (_, payload) = self.command.echo();
        debug!(command = self.command.name(), value = %payload, "applied");
        if let Err(e) = self
            .client
            .publish(&self.echo_topic, payload.as_bytes(), true)
            .await
        {
            warn!(topic = %self.echo_topic, error = %e, "echo not published");
        }
        Ok(())
    }
}
