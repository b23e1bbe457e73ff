pub mod broker;
pub mod command;

pub use broker::{CommandBroker, QueueError};
pub use command::{Command, CommandError, CommandResult, Completion};
