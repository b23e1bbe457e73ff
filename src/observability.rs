//! Observability: tracing setup and process-wide counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::archive::ExecutionReport;

/// Filter used until the configuration has been loaded
pub const BOOTSTRAP_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{directives}': {source}")]
    InvalidFilter {
        directives: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to swap log filter: {0}")]
    Reload(#[from] reload::Error),
}

/// Handle to the global log filter installed by [`init_tracing`]
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogFilterHandle {
    /// Swap in the configured filter directives
    ///
    /// Returns `Ok(false)` without touching the filter when `RUST_LOG` was set
    /// at startup.
    pub fn apply_configured(&self, directives: &str) -> Result<bool, LoggingError> {
        if self.env_override {
            return Ok(false);
        }

        let filter = EnvFilter::try_new(directives).map_err(|source| LoggingError::InvalidFilter {
            directives: directives.to_string(),
            source,
        })?;
        self.handle.reload(filter)?;
        Ok(true)
    }
}

/// Install the global subscriber so configuration loading is already logged
///
/// Starts from `RUST_LOG` when set, else [`BOOTSTRAP_LOG_FILTER`]; the
/// configured filter is applied later through the returned handle.
pub fn init_tracing() -> LogFilterHandle {
    let (filter, env_override) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(BOOTSTRAP_LOG_FILTER), false),
    };

    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    LogFilterHandle {
        handle,
        env_override,
    }
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    commands_completed: AtomicU64,
    commands_failed: AtomicU64,
    commands_canceled: AtomicU64,
    entries_moved: AtomicU64,
    entries_removed: AtomicU64,
    soft_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_completed(&self, report: &ExecutionReport) {
        self.commands_completed.fetch_add(1, Ordering::Relaxed);
        self.entries_moved
            .fetch_add(report.moved.len() as u64, Ordering::Relaxed);
        self.entries_removed
            .fetch_add(report.removed.len() as u64, Ordering::Relaxed);
        self.soft_failures
            .fetch_add(report.failures.len() as u64, Ordering::Relaxed);
        tracing::debug!(counter = "commands_completed", "Metric incremented");
    }

    pub fn command_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "commands_failed", "Metric incremented");
    }

    pub fn command_canceled(&self) {
        self.commands_canceled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "commands_canceled", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_completed: self.commands_completed.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            commands_canceled: self.commands_canceled.load(Ordering::Relaxed),
            entries_moved: self.entries_moved.load(Ordering::Relaxed),
            entries_removed: self.entries_removed.load(Ordering::Relaxed),
            soft_failures: self.soft_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commands_completed: u64,
    pub commands_failed: u64,
    pub commands_canceled: u64,
    pub entries_moved: u64,
    pub entries_removed: u64,
    pub soft_failures: u64,
}
