//! # Commands and the per-device command queue.
//!
//! - [`Operation`] - trait for work expressible against a session
//! - [`OpFn`] - closure-backed operation
//! - [`OperationRef`] - shared reference to an operation (`Arc<dyn Operation>`)
//! - [`Command`] - an operation plus its attempt counter
//! - [`CommandSender`] / [`CommandReceiver`] - bounded, closable FIFO

mod command;
mod op_fn;
mod operation;
pub(crate) mod queue;

pub use command::Command;
pub use op_fn::OpFn;
pub use operation::{Operation, OperationRef};
pub use queue::{CommandReceiver, CommandSender, TryPushError, channel as command_queue};
