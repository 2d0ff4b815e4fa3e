use std::fmt;

/// Connection state of one device, owned by its supervisor task.
///
/// ```text
///   Idle ──(first command)──► Connecting ──► Bootstrapping ──► Active
///    ▲                            │               │              │
///    └──────(backoff)──── Disconnected ◄──────────┴──────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No link; waiting for the next command.
    Idle,
    /// Dialing the transport.
    Connecting,
    /// Authorizing sessions and waking the vehicle.
    Bootstrapping,
    /// Fully authorized; commands execute.
    Active,
    /// Link torn down; waiting out the reconnect delay.
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Bootstrapping => "bootstrapping",
            ConnectionState::Active => "active",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible projection of [`ConnectionState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// The device is `Active`.
    Online,
    /// Anything else.
    Offline,
}

impl Connectivity {
    /// Payload published on the device status topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Connectivity::Online => "online",
            Connectivity::Offline => "offline",
        }
    }

    pub fn is_online(self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
