use std::fmt;

/// A subset of the vehicle command surface that needs its own session authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Vehicle security controller; always reachable, able to wake the car.
    Security,
    /// Infotainment computer; rejects sessions while the vehicle sleeps.
    Infotainment,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Security => "security",
            Domain::Infotainment => "infotainment",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domains authorized in the first bootstrap phase (enough to wake the vehicle).
pub const WAKE_DOMAINS: &[Domain] = &[Domain::Security];

/// Domains authorized once the vehicle is awake.
pub const FULL_DOMAINS: &[Domain] = &[Domain::Security, Domain::Infotainment];

/// Primitive vehicle actions understood by a [`Session`](super::Session).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Wake a dormant vehicle (security domain).
    WakeUp,
    /// Liveness probe.
    Ping,
    /// Set the charging current limit in amperes.
    SetChargingAmps(i32),
    /// Start charging.
    StartCharging,
    /// Stop charging.
    StopCharging,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::WakeUp => "wake_up",
            Action::Ping => "ping",
            Action::SetChargingAmps(_) => "set_charging_amps",
            Action::StartCharging => "start_charging",
            Action::StopCharging => "stop_charging",
        }
    }
}
