//! # Bounded, closable per-device command queue.
//!
//! ```text
//! BusBridge ──push()──►┌──────────────────────┐──pop()──► DeviceSupervisor
//! RetryPolicy ─try_push()►  mpsc (capacity N)  │
//!                      └──────────────────────┘
//!                          ▲ close(): CancellationToken
//! ```
//!
//! ## Rules
//! - FIFO; requeued commands go to the back.
//! - `push` waits while the queue is full (backpressure towards the bus).
//! - After `close()`, waiting and future `push` calls fail with [`QueueError::Closed`]
//!   and `pop` returns `None` immediately, even if commands are still buffered.
//! - `close()` is idempotent.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::commands::Command;
use crate::error::QueueError;

/// Creates a queue with the given capacity (clamped to at least 1).
pub fn channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let closed = CancellationToken::new();
    (
        CommandSender {
            tx,
            closed: closed.clone(),
        },
        CommandReceiver { rx, closed },
    )
}

/// Error of [`CommandSender::try_push`]; hands the command back.
#[derive(Debug)]
pub enum TryPushError {
    /// Queue at capacity.
    Full(Command),
    /// Queue closed.
    Closed(Command),
}

impl TryPushError {
    pub fn into_command(self) -> Command {
        match self {
            TryPushError::Full(c) | TryPushError::Closed(c) => c,
        }
    }

    pub fn as_queue_error(&self) -> QueueError {
        match self {
            TryPushError::Full(_) => QueueError::Full,
            TryPushError::Closed(_) => QueueError::Closed,
        }
    }
}

/// Producer side; cheap to clone.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
    closed: CancellationToken,
}

impl CommandSender {
    /// Enqueues a command, waiting while the queue is full.
    pub async fn push(&self, cmd: Command) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(QueueError::Closed),
            res = self.tx.send(cmd) => res.map_err(|_| QueueError::Closed),
        }
    }

    /// Enqueues a command without waiting.
    pub fn try_push(&self, cmd: Command) -> Result<(), TryPushError> {
        if self.closed.is_cancelled() {
            return Err(TryPushError::Closed(cmd));
        }
        self.tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(c) => TryPushError::Full(c),
            mpsc::error::TrySendError::Closed(c) => TryPushError::Closed(c),
        })
    }

    /// Closes the queue for every holder.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Number of buffered commands.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer side; owned by the device supervisor.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<Command>,
    closed: CancellationToken,
}

impl CommandReceiver {
    /// Waits for the next command; `None` once the queue is closed.
    ///
    /// Cancel-safe: no command is lost when the returned future is dropped.
    pub async fn pop(&mut self) -> Option<Command> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            cmd = self.rx.recv() => cmd,
        }
    }

    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the queue is closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}
