use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::ArchiveError;
use super::selector::{self, Candidate, Clock, ReferenceTime};
use super::{mover, remover};
use crate::config::{ConfigHandle, MonitoringMode, RetentionRule};
use crate::worker::{AnyError, CommandExecutor};

/// The two batch operations a command can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveAction {
    MoveToArchive,
    DeleteFromArchive,
}

impl ArchiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveAction::MoveToArchive => "move_to_archive",
            ArchiveAction::DeleteFromArchive => "delete_from_archive",
        }
    }
}

impl std::fmt::Display for ArchiveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in a rule's processing a soft failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Prepare,
    Scan,
    Move,
    Remove,
}

/// An entry- or container-level error that was recorded and skipped
#[derive(Debug, Clone, Serialize)]
pub struct SoftFailure {
    pub rule: usize,
    pub path: PathBuf,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Outcome of one action pass across all rules
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub action: ArchiveAction,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub moved: Vec<Relocation>,
    pub removed: Vec<PathBuf>,
    pub failures: Vec<SoftFailure>,
}

impl ExecutionReport {
    fn new(action: ArchiveAction, reference: ReferenceTime) -> Self {
        Self {
            action,
            started_at: reference.instant(),
            finished_at: reference.instant(),
            moved: Vec::new(),
            removed: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, rule: usize, path: &Path, stage: FailureStage, error: &ArchiveError) {
        warn!(rule, path = %path.display(), ?stage, error = %error, "Skipping after soft failure");
        self.failures.push(SoftFailure {
            rule,
            path: path.to_path_buf(),
            stage,
            message: error.to_string(),
        });
    }
}

/// Run `action` over `rules` in order, comparing ages against `reference`.
///
/// Never fails as a whole: every per-entry or per-container error is recorded
/// in the report and processing moves on.
pub fn run_pass(
    rules: &[RetentionRule],
    action: ArchiveAction,
    reference: ReferenceTime,
) -> ExecutionReport {
    let mut report = ExecutionReport::new(action, reference);

    for (index, rule) in rules.iter().enumerate() {
        match action {
            ArchiveAction::MoveToArchive => move_rule(index, rule, reference, &mut report),
            ArchiveAction::DeleteFromArchive => delete_rule(index, rule, reference, &mut report),
        }
    }

    report.finished_at = Utc::now().max(report.started_at);
    report
}

fn move_rule(index: usize, rule: &RetentionRule, reference: ReferenceTime, report: &mut ExecutionReport) {
    for dir in [&rule.source_path, &rule.archive_path] {
        if let Err(e) = ensure_dir(dir) {
            report.fail(index, dir, FailureStage::Prepare, &e);
            return;
        }
    }

    let clock = Clock::for_rule(rule.use_utc_time);
    let cutoff = reference.cutoff(clock, rule.move_older_than_days);

    for_each_selection(
        index,
        rule,
        &rule.source_path,
        rule.move_after_reaching_count,
        report,
        |listing, pattern| selector::select_older_than(listing, pattern, clock, cutoff),
        |candidate, report| relocate(index, rule, candidate, report),
    );
}

fn delete_rule(index: usize, rule: &RetentionRule, reference: ReferenceTime, report: &mut ExecutionReport) {
    if let Err(e) = ensure_dir(&rule.archive_path) {
        report.fail(index, &rule.archive_path, FailureStage::Prepare, &e);
        return;
    }

    let clock = Clock::for_rule(rule.use_utc_time);
    let cutoff = reference.cutoff(clock, rule.delete_older_than_days);

    for_each_selection(
        index,
        rule,
        &rule.archive_path,
        rule.delete_after_reaching_count,
        report,
        |listing, pattern| selector::select_older_than(listing, pattern, clock, cutoff),
        |candidate, report| {
            let path = candidate.path();
            match remover::remove_entry(&path) {
                Ok(()) => report.removed.push(path),
                Err(e) => report.fail(index, &path, FailureStage::Remove, &e),
            }
        },
    );
}

/// For every effective pattern: an age pass, then (with a fresh listing) a count pass.
fn for_each_selection<S, A>(
    index: usize,
    rule: &RetentionRule,
    container: &Path,
    keep: Option<u32>,
    report: &mut ExecutionReport,
    select_by_age: S,
    mut apply: A,
) where
    S: Fn(&[Candidate], &glob::Pattern) -> Vec<Candidate>,
    A: FnMut(&Candidate, &mut ExecutionReport),
{
    for raw in rule.effective_patterns() {
        let pattern = match selector::compile_pattern(raw) {
            Ok(pattern) => pattern,
            Err(e) => {
                report.fail(index, container, FailureStage::Prepare, &e);
                continue;
            }
        };

        if let Some(listing) = list(index, rule, container, report) {
            for candidate in select_by_age(&listing, &pattern) {
                apply(&candidate, report);
            }
        }

        let Some(keep) = keep else { continue };
        if let Some(listing) = list(index, rule, container, report) {
            for candidate in selector::select_above_count(&listing, &pattern, keep as usize) {
                apply(&candidate, report);
            }
        }
    }
}

fn list(
    index: usize,
    rule: &RetentionRule,
    container: &Path,
    report: &mut ExecutionReport,
) -> Option<Vec<Candidate>> {
    match selector::scan_container(container, rule.monitoring_mode) {
        Ok(listing) => Some(listing),
        Err(e) => {
            report.fail(index, container, FailureStage::Scan, &e);
            None
        }
    }
}

fn relocate(index: usize, rule: &RetentionRule, candidate: &Candidate, report: &mut ExecutionReport) {
    let from = candidate.path();
    let outcome = match rule.monitoring_mode {
        MonitoringMode::FilesOnly => mover::move_file(&from, &rule.archive_path),
        MonitoringMode::SubdirectoriesOnly => {
            let to = rule.archive_path.join(&candidate.name);
            mover::move_directory(&from, &to).map(|()| to)
        }
    };

    match outcome {
        Ok(to) => report.moved.push(Relocation { from, to }),
        Err(e) => report.fail(index, &from, FailureStage::Move, &e),
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(dir).map_err(|e| ArchiveError::io(dir, e))
}

/// Runs action passes against the current configuration snapshot
#[derive(Debug, Clone)]
pub struct PolicyExecutor {
    config: ConfigHandle,
}

impl PolicyExecutor {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }
}

#[async_trait]
impl CommandExecutor for PolicyExecutor {
    async fn execute(&self, action: ArchiveAction) -> Result<ExecutionReport, AnyError> {
        // Read once; a reload during the pass applies to the next one
        let config = self.config.snapshot().await;
        debug!(%action, rules = config.rules.len(), "Starting pass");

        let report =
            tokio::task::spawn_blocking(move || run_pass(&config.rules, action, ReferenceTime::now()))
                .await?;

        info!(
            %action,
            moved = report.moved.len(),
            removed = report.removed.len(),
            failures = report.failures.len(),
            "Pass finished"
        );
        Ok(report)
    }
}
