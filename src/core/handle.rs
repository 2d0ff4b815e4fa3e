use std::sync::Arc;

use tokio::sync::watch;

use crate::commands::{Command, CommandSender, TryPushError};
use crate::core::Connectivity;
use crate::error::QueueError;

/// Client-side handle to one supervised device.
///
/// Cheap to clone. Holds the producer side of the device's command queue and a
/// receiver of its connectivity; it never touches the connection itself.
#[derive(Clone, Debug)]
pub struct DeviceHandle {
    id: Arc<str>,
    commands: CommandSender,
    connectivity: watch::Receiver<Connectivity>,
}

impl DeviceHandle {
    pub(crate) fn new(
        id: Arc<str>,
        commands: CommandSender,
        connectivity: watch::Receiver<Connectivity>,
    ) -> Self {
        Self {
            id,
            commands,
            connectivity,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Enqueues a command, waiting while the queue is full.
    pub async fn push(&self, cmd: Command) -> Result<(), QueueError> {
        self.commands.push(cmd).await
    }

    /// Enqueues a command without waiting.
    pub fn try_push(&self, cmd: Command) -> Result<(), TryPushError> {
        self.commands.try_push(cmd)
    }

    /// Closes the command queue; the supervisor exits once it notices.
    pub fn close(&self) {
        self.commands.close();
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Commands currently buffered.
    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    /// Last announced connectivity.
    pub fn connectivity(&self) -> Connectivity {
        *self.connectivity.borrow()
    }

    /// A receiver that observes connectivity changes.
    pub fn watch_connectivity(&self) -> watch::Receiver<Connectivity> {
        self.connectivity.clone()
    }
}
