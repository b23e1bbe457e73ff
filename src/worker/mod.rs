//! Command worker
//!
//! A single task drains the command queue in FIFO order and hands each
//! command's action to a [`CommandExecutor`]. At most one command executes at
//! any moment.

pub mod runner;

use async_trait::async_trait;

use crate::archive::{ArchiveAction, ExecutionReport};

pub use runner::Worker;

pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Runs one action across all configured rules
///
/// Soft per-entry problems belong in the report. An `Err` means the whole
/// pass could not run and fails the command.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, action: ArchiveAction) -> Result<ExecutionReport, AnyError>;
}
