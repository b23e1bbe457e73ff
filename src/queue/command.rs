use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::archive::{ArchiveAction, ExecutionReport};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command canceled before execution")]
    Canceled,

    #[error("command failed: {0}")]
    Failed(String),
}

pub type CommandResult = Result<ExecutionReport, CommandError>;

/// One queued request to run an action across all rules.
///
/// Settling methods take `self`, so a command resolves its completion at most
/// once. Dropping it unsettled resolves the completion as canceled.
#[derive(Debug)]
pub struct Command {
    pub id: Uuid,
    pub action: ArchiveAction,
    pub enqueued_at: DateTime<Utc>,
    completion: oneshot::Sender<CommandResult>,
}

impl Command {
    /// Create a command together with the handle its caller awaits
    pub fn new(action: ArchiveAction) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::now_v7();
        let command = Self {
            id,
            action,
            enqueued_at: Utc::now(),
            completion: tx,
        };
        let completion = Completion { id, action, rx };
        (command, completion)
    }

    pub fn complete(self, report: ExecutionReport) {
        // The caller may have dropped its handle; nothing to tell then
        let _ = self.completion.send(Ok(report));
    }

    pub fn fail(self, message: impl Into<String>) {
        let _ = self.completion.send(Err(CommandError::Failed(message.into())));
    }

    pub fn cancel(self) {
        let _ = self.completion.send(Err(CommandError::Canceled));
    }
}

/// Future resolving once the worker has settled the matching [`Command`]
#[derive(Debug)]
pub struct Completion {
    id: Uuid,
    action: ArchiveAction,
    rx: oneshot::Receiver<CommandResult>,
}

impl Completion {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn action(&self) -> ArchiveAction {
        self.action
    }
}

impl Future for Completion {
    type Output = CommandResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CommandError::Canceled)))
    }
}
