//! Topic layout.
//!
//! ```text
//! <prefix>/status                     bridge availability (online / last will offline)
//! <prefix>/<id>/status                device connectivity, retained
//! <prefix>/<id>/charging_amps_set     inbound
//! <prefix>/<id>/charging_amps         echo, retained
//! <prefix>/<id>/charging_set          inbound
//! <prefix>/<id>/charging              echo, retained
//! <prefix>/<id>/command_failed        failure reports
//! ```

use std::sync::Arc;

pub const STATUS: &str = "status";
pub const CHARGING_AMPS: &str = "charging_amps";
pub const CHARGING_AMPS_SET: &str = "charging_amps_set";
pub const CHARGING: &str = "charging";
pub const CHARGING_SET: &str = "charging_set";
pub const COMMAND_FAILED: &str = "command_failed";

/// Inbound values the bridge subscribes to per device.
pub const INBOUND: &[&str] = &[CHARGING_AMPS_SET, CHARGING_SET];

/// Builds and parses topics under one prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    prefix: Arc<str>,
}

impl Topics {
    pub fn new(prefix: impl Into<Arc<str>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `<prefix>/status`
    pub fn bridge_status(&self) -> String {
        format!("{}/{STATUS}", self.prefix)
    }

    /// `<prefix>/<id>/<value>`
    pub fn device(&self, id: &str, value: &str) -> String {
        format!("{}/{id}/{value}", self.prefix)
    }

    /// Splits `<prefix>/<id>/<value>` into `(id, value)`.
    pub fn parse<'a>(&self, topic: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = topic.strip_prefix(&*self.prefix)?.strip_prefix('/')?;
        let (id, value) = rest.split_once('/')?;
        if id.is_empty() || value.is_empty() || value.contains('/') {
            return None;
        }
        Some((id, value))
    }
}
