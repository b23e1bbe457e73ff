use crate::archive::ArchiveAction;
use crate::queue::command::{Command, Completion};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("command queue is closed")]
    Closed,
}

/// CommandBroker is the producer side of the single worker's FIFO queue
///
/// Architecture:
/// 1. A producer (timer task or manual trigger) calls `broker.enqueue(action)`
/// 2. Broker builds a `Command` plus the `Completion` handed back to the caller
/// 3. Broker sends the command over an unbounded mpsc channel
/// 4. Exactly one worker owns the receiver and drains it in order
///
/// Sending never waits, so triggers return their completion immediately.
/// Clones share the same channel.
#[derive(Debug, Clone)]
pub struct CommandBroker {
    sender: mpsc::UnboundedSender<Command>,
}

impl CommandBroker {
    /// Create a broker and the receiver the worker will consume
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a command for `action` and return its completion handle
    pub fn enqueue(&self, action: ArchiveAction) -> Result<Completion, QueueError> {
        let (command, completion) = Command::new(action);
        let id = command.id;

        match self.sender.send(command) {
            Ok(()) => {
                debug!(command_id = %id, %action, "Command queued");
                Ok(completion)
            }
            Err(mpsc::error::SendError(command)) => {
                warn!(command_id = %id, %action, "Worker gone, command not delivered");
                command.cancel();
                Err(QueueError::Closed)
            }
        }
    }

    /// Check whether the worker side is still receiving
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
