//! Error types used by the fleetvisor runtime, its collaborators and the bus bridge.
//!
//! - [`RuntimeError`]: errors raised by the fleet runtime itself.
//! - [`ConfigError`]: startup configuration failures (always fatal).
//! - [`LinkError`]: transport/session failures reported by the vehicle link.
//! - [`CommandError`]: failures of a single command attempt.
//! - [`QueueError`]: command queue submission failures.
//! - [`BusError`]: publish/subscribe failures of the bus client.
//! - [`InboundError`]: inbound bus messages that could not become commands.
//!
//! Every enum provides `as_label` (stable snake_case label for logs).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the fleet runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some device supervisors did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Devices whose supervisor did not exit in time.
        stuck: Vec<String>,
    },

    /// A device with the same logical id is already supervised.
    #[error("device '{id}' is already supervised")]
    DuplicateDevice {
        /// Logical device id.
        id: String,
    },

    /// No supervised device has this logical id.
    #[error("device '{id}' is not supervised")]
    UnknownDevice {
        /// Logical device id.
        id: String,
    },

    /// The fleet is shutting down and accepts no new devices.
    #[error("fleet is shutting down")]
    ShuttingDown,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fleetvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::DuplicateDevice { .. } => "runtime_duplicate_device",
            RuntimeError::UnknownDevice { .. } => "runtime_unknown_device",
            RuntimeError::ShuttingDown => "runtime_shutting_down",
        }
    }
}

/// # Startup configuration errors.
///
/// There is no partial-startup mode: any of these aborts the process.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the schema.
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is syntactically fine but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Two devices share the same logical id.
    #[error("duplicate device id '{0}'")]
    DuplicateDevice(String),

    /// A device credential could not be loaded.
    #[error("failed to load private key {path}: {reason}")]
    Credential {
        /// Key file path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "config_io",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::Invalid(_) => "config_invalid",
            ConfigError::DuplicateDevice(_) => "config_duplicate_device",
            ConfigError::Credential { .. } => "config_credential",
        }
    }
}

/// # Failures of the vehicle link (transport + session).
///
/// All link errors are retried by the supervisor through its backoff loop; the
/// runtime does not distinguish a misconfigured vehicle from a transient fault.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The transport could not reach the device.
    #[error("connect to {address} failed: {reason}")]
    Connect {
        /// Physical address that was dialed.
        address: String,
        /// Transport-specific reason.
        reason: String,
    },

    /// The device rejected the session (e.g. key not enrolled).
    #[error("session rejected: {reason}")]
    Session {
        /// Session-specific reason.
        reason: String,
    },

    /// The device rejected or failed an action on an established session.
    #[error("action rejected: {reason}")]
    Rejected {
        /// Device-reported reason.
        reason: String,
    },

    /// The underlying connection went away.
    #[error("disconnected: {reason}")]
    Disconnected {
        /// Link-specific reason.
        reason: String,
    },

    /// The call was aborted by the runtime cancellation token.
    #[error("link call cancelled")]
    Canceled,
}

impl LinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LinkError::Connect { .. } => "link_connect",
            LinkError::Session { .. } => "link_session",
            LinkError::Rejected { .. } => "link_rejected",
            LinkError::Disconnected { .. } => "link_disconnected",
            LinkError::Canceled => "link_canceled",
        }
    }
}

/// # Failures of a single command attempt.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The session reported an error while running the command.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The command failed for a reason of its own.
    #[error("command failed: {reason}")]
    Fail {
        /// Human-readable reason.
        reason: String,
    },

    /// The command observed runtime cancellation.
    #[error("command cancelled")]
    Canceled,
}

impl CommandError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fleetvisor::{CommandError, LinkError};
    ///
    /// let err = CommandError::from(LinkError::Canceled);
    /// assert_eq!(err.as_label(), "link_canceled");
    /// assert!(err.is_canceled());
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandError::Link(e) => e.as_label(),
            CommandError::Fail { .. } => "command_failed",
            CommandError::Canceled => "command_canceled",
        }
    }

    /// True when the failure stems from runtime cancellation rather than the device.
    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            CommandError::Canceled | CommandError::Link(LinkError::Canceled)
        )
    }
}

/// Error returned when a command cannot be enqueued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The owning device has been shut down.
    #[error("command queue closed")]
    Closed,

    /// The queue is at capacity (non-blocking submission only).
    #[error("command queue full")]
    Full,
}

/// # Failures reported by the bus client.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A publication was not accepted.
    #[error("publish to {topic} failed: {reason}")]
    Publish {
        /// Target topic.
        topic: String,
        /// Client-specific reason.
        reason: String,
    },

    /// A subscription was not accepted.
    #[error("subscribe to {topic} failed: {reason}")]
    Subscribe {
        /// Topic filter.
        topic: String,
        /// Client-specific reason.
        reason: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Publish { .. } => "bus_publish",
            BusError::Subscribe { .. } => "bus_subscribe",
        }
    }
}

/// # Inbound bus messages that could not be turned into commands.
///
/// These are logged and dropped; they are never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InboundError {
    /// No attached device listens on this topic.
    #[error("no route for topic {0}")]
    UnknownTopic(String),

    /// The payload could not be parsed for this topic.
    #[error("invalid payload {payload:?}: {reason}")]
    InvalidPayload {
        /// Raw payload (lossy UTF-8).
        payload: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The device queue no longer accepts commands.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl InboundError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InboundError::UnknownTopic(_) => "inbound_unknown_topic",
            InboundError::InvalidPayload { .. } => "inbound_invalid_payload",
            InboundError::Queue(_) => "inbound_queue_closed",
        }
    }
}
