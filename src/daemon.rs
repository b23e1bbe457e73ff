use logkeeper::archive::{ArchiveAction, ExecutionReport, PolicyExecutor};
use logkeeper::config::{Config, ConfigHandle};
use logkeeper::engine::ArchiveEngine;
use logkeeper::worker::CommandExecutor;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Run the engine until ctrl-c or SIGTERM; SIGHUP reloads the rules
pub async fn run(config: Config, config_path: PathBuf) -> Result<(), AnyError> {
    let handle = ConfigHandle::new(config.processor);
    let engine = ArchiveEngine::new(handle.clone());

    engine.start().await?;
    info!(config = %config_path.display(), "logkeeper running");

    let outcome = wait_for_shutdown(&handle, &config_path).await;

    engine.stop().await;
    let metrics = engine.metrics();
    info!(
        completed = metrics.commands_completed,
        failed = metrics.commands_failed,
        moved = metrics.entries_moved,
        removed = metrics.entries_removed,
        "logkeeper exiting"
    );
    outcome
}

/// Run a single pass directly, without the queue or the timer
pub async fn run_once(config: Config, action: ArchiveAction, json: bool) -> Result<(), AnyError> {
    let executor = PolicyExecutor::new(ConfigHandle::new(config.processor));
    let report = executor.execute(action).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ExecutionReport) {
    println!(
        "{}: {} moved, {} removed, {} failures",
        report.action,
        report.moved.len(),
        report.removed.len(),
        report.failures.len()
    );
    for relocation in &report.moved {
        println!("  moved   {} -> {}", relocation.from.display(), relocation.to.display());
    }
    for path in &report.removed {
        println!("  removed {}", path.display());
    }
    for failure in &report.failures {
        println!(
            "  failed  {} (rule {}, {:?}): {}",
            failure.path.display(),
            failure.rule,
            failure.stage,
            failure.message
        );
    }
}

async fn reload(handle: &ConfigHandle, config_path: &Path) {
    match Config::load_from_path(config_path.to_path_buf()) {
        Ok(config) => handle.replace(config.processor).await,
        Err(e) => warn!(error = %e, "Reload failed, keeping current configuration"),
    }
}

#[cfg(unix)]
async fn wait_for_shutdown(handle: &ConfigHandle, config_path: &Path) -> Result<(), AnyError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = sigterm.recv() => break,
            _ = sighup.recv() => {
                info!("SIGHUP received, reloading configuration");
                reload(handle, config_path).await;
            }
        }
    }

    info!("Shutdown signal received");
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_handle: &ConfigHandle, _config_path: &Path) -> Result<(), AnyError> {
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}
