//! Archive engine lifecycle
//!
//! Owns the command queue, the single worker and the periodic timer. While
//! running, every timer tick queues `MoveToArchive` followed by
//! `DeleteFromArchive`; manual triggers queue one command and hand back its
//! [`Completion`].
//!
//! ```text
//!            start()                 stop()
//!  Stopped ───────────▶ Running ───────────▶ Stopped
//!     ▲                                        │
//!     └──────────── start() again ◀────────────┘
//! ```
//!
//! Stopping disarms the timer first, cancels whatever is still queued and
//! waits for the command in flight to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::archive::{ArchiveAction, PolicyExecutor};
use crate::config::{ConfigHandle, ProcessorConfig};
use crate::observability::{Metrics, MetricsSnapshot};
use crate::queue::{CommandBroker, Completion};
use crate::worker::{CommandExecutor, Worker};

const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,
}

struct Running {
    broker: CommandBroker,
    stopping: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
    worker: JoinHandle<()>,
}

pub struct ArchiveEngine {
    config: ConfigHandle,
    executor: Arc<dyn CommandExecutor>,
    metrics: Arc<Metrics>,
    state: Mutex<Option<Running>>,
}

impl ArchiveEngine {
    /// Engine running passes against the rules in `config`
    pub fn new(config: ConfigHandle) -> Self {
        let executor = Arc::new(PolicyExecutor::new(config.clone()));
        Self::with_executor(config, executor)
    }

    pub fn with_executor(config: ConfigHandle, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config,
            executor,
            metrics: Arc::new(Metrics::new()),
            state: Mutex::new(None),
        }
    }

    /// Spawn the worker and arm the timer
    ///
    /// Timer settings are read once here; a later config reload changes the
    /// rules used by each pass but not the schedule.
    pub async fn start(&self) -> Result<(), EngineError> {
        let config = self.config.snapshot().await;
        let (first_fire, period) = schedule(&config);

        let mut state = self.lock_state();
        if state.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let (broker, receiver) = CommandBroker::new();
        let stopping = Arc::new(AtomicBool::new(false));

        let worker = Worker::new(
            receiver,
            Arc::clone(&self.executor),
            Arc::clone(&stopping),
            Arc::clone(&self.metrics),
        );
        let worker = tokio::spawn(worker.run());
        let timer = config
            .auto_timer_enabled
            .then(|| tokio::spawn(run_timer(broker.clone(), first_fire, period)));

        *state = Some(Running {
            broker,
            stopping,
            timer,
            worker,
        });

        if config.auto_timer_enabled {
            info!(
                first_fire_secs = first_fire.as_secs(),
                period_secs = period.as_secs(),
                rules = config.rules.len(),
                "Archive engine started"
            );
        } else {
            info!(rules = config.rules.len(), "Archive engine started, manual triggers only");
        }
        Ok(())
    }

    /// Stop the engine; a no-op when already stopped
    pub async fn stop(&self) {
        let running = {
            let mut state = self.lock_state();
            let running = state.take();
            if let Some(running) = &running {
                running.stopping.store(true, Ordering::Release);
            }
            running
        };

        let Some(running) = running else {
            debug!("Stop requested while already stopped");
            return;
        };

        info!("Stopping archive engine");

        if let Some(timer) = running.timer {
            timer.abort();
            // The timer owns a broker clone; it must be gone before the queue can close
            if let Err(e) = timer.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Timer task ended abnormally");
                }
            }
        }

        drop(running.broker);
        if let Err(e) = running.worker.await {
            warn!(error = %e, "Worker task ended abnormally");
        }

        info!("Archive engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_some()
    }

    pub fn trigger_move_to_archive(&self) -> Result<Completion, EngineError> {
        self.trigger(ArchiveAction::MoveToArchive)
    }

    pub fn trigger_delete_from_archive(&self) -> Result<Completion, EngineError> {
        self.trigger(ArchiveAction::DeleteFromArchive)
    }

    /// Queue `action` behind anything already pending
    pub fn trigger(&self, action: ArchiveAction) -> Result<Completion, EngineError> {
        let state = self.lock_state();
        let running = state.as_ref().ok_or(EngineError::NotRunning)?;
        running
            .broker
            .enqueue(action)
            .map_err(|_| EngineError::NotRunning)
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<Running>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ArchiveEngine {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = state.take() {
            // Without an await here, the worker drains and exits on its own
            // once the broker below is dropped.
            running.stopping.store(true, Ordering::Release);
            if let Some(timer) = running.timer {
                timer.abort();
            }
        }
    }
}

/// First fire delay and period for the timer
fn schedule(config: &ProcessorConfig) -> (Duration, Duration) {
    let period = config.auto_interval.as_duration().max(MIN_TIMER_PERIOD);
    let first_fire = if config.archive_on_startup {
        config.startup_delay.as_duration()
    } else {
        period
    };
    (first_fire, period)
}

async fn run_timer(broker: CommandBroker, first_fire: Duration, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + first_fire, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        debug!("Archive timer fired");

        // Completions are dropped; the worker logs the outcome of timer runs
        for action in [ArchiveAction::MoveToArchive, ArchiveAction::DeleteFromArchive] {
            if broker.enqueue(action).is_err() {
                return;
            }
        }
    }
}
