//! Worker loop - settles queued commands one at a time

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span};

use super::CommandExecutor;
use crate::observability::Metrics;
use crate::queue::Command;

/// Sole consumer of the command queue
///
/// Once `stopping` is raised, commands still waiting in the queue are
/// canceled without running. A command already executing runs to the end.
pub struct Worker {
    receiver: mpsc::UnboundedReceiver<Command>,
    executor: Arc<dyn CommandExecutor>,
    stopping: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

impl Worker {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Command>,
        executor: Arc<dyn CommandExecutor>,
        stopping: Arc<AtomicBool>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            receiver,
            executor,
            stopping,
            metrics,
        }
    }

    /// Drain the queue until every sender is gone
    pub async fn run(mut self) {
        info!("Worker started");

        while let Some(command) = self.receiver.recv().await {
            if self.stopping.load(Ordering::Acquire) {
                debug!(command_id = %command.id, action = %command.action, "Canceling queued command");
                self.metrics.command_canceled();
                command.cancel();
                continue;
            }

            let span = info_span!("command", command_id = %command.id, action = %command.action);
            self.process(command).instrument(span).await;
        }

        info!("Worker stopped");
    }

    async fn process(&self, command: Command) {
        let executor = Arc::clone(&self.executor);
        let action = command.action;

        // Run on its own task so a panicking executor fails the command
        // instead of taking the worker down.
        let outcome = tokio::spawn(async move { executor.execute(action).await }).await;

        match outcome {
            Ok(Ok(report)) => {
                info!(
                    moved = report.moved.len(),
                    removed = report.removed.len(),
                    failures = report.failures.len(),
                    "Command completed"
                );
                self.metrics.command_completed(&report);
                command.complete(report);
            }
            Ok(Err(e)) => {
                error!(error = %e, "Command failed");
                self.metrics.command_failed();
                command.fail(e.to_string());
            }
            Err(join_error) => {
                error!(error = %join_error, "Executor aborted");
                self.metrics.command_failed();
                command.fail(join_error.to_string());
            }
        }
    }
}
