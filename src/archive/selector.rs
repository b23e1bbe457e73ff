//! Candidate selection by age and by count
//!
//! Listing (`scan_container`) touches the filesystem; the two selection
//! functions are pure over the listing so they can be tested without a disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, Utc};
use glob::Pattern;
use serde::Serialize;
use tracing::debug;

use super::error::{ArchiveError, Result};
use crate::config::MonitoringMode;

/// One file or directory found in a scanned container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub container: PathBuf,
    pub name: String,
    pub modified: SystemTime,
}

impl Candidate {
    pub fn path(&self) -> PathBuf {
        self.container.join(&self.name)
    }
}

/// Which wall clock a rule compares timestamps in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Utc,
    Local,
}

impl Clock {
    pub fn for_rule(use_utc_time: bool) -> Self {
        if use_utc_time { Clock::Utc } else { Clock::Local }
    }

    /// Wall-clock reading of `time` in this clock
    pub fn stamp(self, time: SystemTime) -> NaiveDateTime {
        match self {
            Clock::Utc => DateTime::<Utc>::from(time).naive_utc(),
            Clock::Local => DateTime::<Local>::from(time).naive_local(),
        }
    }
}

/// "Now", captured once per pass and shared by every rule in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTime(DateTime<Utc>);

impl ReferenceTime {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// `now - days` as a wall-clock reading of `clock`
    pub fn cutoff(&self, clock: Clock, days: u32) -> NaiveDateTime {
        let now = match clock {
            Clock::Utc => self.0.naive_utc(),
            Clock::Local => self.0.with_timezone(&Local).naive_local(),
        };
        TimeDelta::try_days(i64::from(days))
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(NaiveDateTime::MIN)
    }
}

pub fn compile_pattern(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| ArchiveError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })
}

/// List the immediate files or subdirectories of `container`.
///
/// A missing container yields an empty listing. Entries that vanish or cannot
/// be stat'ed mid-scan are skipped; so are names that are not valid UTF-8.
pub fn scan_container(container: &Path, mode: MonitoringMode) -> Result<Vec<Candidate>> {
    let read_dir = match fs::read_dir(container) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ArchiveError::io(container, e)),
    };

    let mut entries = Vec::new();
    for item in read_dir {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %container.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        // DirEntry::metadata does not follow symlinks
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "Skipping entry without metadata");
                continue;
            }
        };

        let wanted = match mode {
            MonitoringMode::FilesOnly => !metadata.is_dir(),
            MonitoringMode::SubdirectoriesOnly => metadata.is_dir(),
        };
        if !wanted {
            continue;
        }

        let Ok(name) = entry.file_name().into_string() else {
            debug!(path = %entry.path().display(), "Skipping non UTF-8 name");
            continue;
        };

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "Skipping entry without mtime");
                continue;
            }
        };

        entries.push(Candidate {
            container: container.to_path_buf(),
            name,
            modified,
        });
    }

    Ok(entries)
}

/// Entries matching `pattern` whose mtime, read in `clock`, is at or before `cutoff`
pub fn select_older_than(
    entries: &[Candidate],
    pattern: &Pattern,
    clock: Clock,
    cutoff: NaiveDateTime,
) -> Vec<Candidate> {
    entries
        .iter()
        .filter(|entry| pattern.matches(&entry.name))
        .filter(|entry| clock.stamp(entry.modified) <= cutoff)
        .cloned()
        .collect()
}

/// Every entry matching `pattern` except the `keep` most recently modified.
///
/// Entries sharing an mtime keep their listing order, which the platform does
/// not define.
pub fn select_above_count(entries: &[Candidate], pattern: &Pattern, keep: usize) -> Vec<Candidate> {
    let mut matching: Vec<&Candidate> = entries
        .iter()
        .filter(|entry| pattern.matches(&entry.name))
        .collect();

    if matching.len() <= keep {
        return Vec::new();
    }

    matching.sort_by(|a, b| b.modified.cmp(&a.modified));
    matching.into_iter().skip(keep).cloned().collect()
}
