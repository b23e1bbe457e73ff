//! Filesystem-level retention scenarios
//!
//! Every test builds a throwaway source/archive pair under a TempDir, ages
//! entries by rewriting their mtimes, and runs single passes against a fixed
//! reference time.

use chrono::{DateTime, Utc};
use logkeeper::archive::{ArchiveAction, ReferenceTime, run_pass};
use logkeeper::config::{MonitoringMode, RetentionRule};
use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const DAY: u64 = 86_400;

struct Fixture {
    _temp_dir: TempDir,
    source: PathBuf,
    archive: PathBuf,
    now: DateTime<Utc>,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("logs");
        let archive = temp_dir.path().join("archive");
        fs::create_dir_all(&source).unwrap();

        Self {
            _temp_dir: temp_dir,
            source,
            archive,
            now: Utc::now(),
        }
    }

    fn rule(&self) -> RetentionRule {
        RetentionRule::new(&self.source, &self.archive)
    }

    fn reference(&self) -> ReferenceTime {
        ReferenceTime::at(self.now)
    }

    fn aged(&self, days: u64) -> SystemTime {
        SystemTime::from(self.now) - Duration::from_secs(days * DAY)
    }

    fn file(&self, dir: &Path, name: &str, days: u64) {
        let path = dir.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        set_mtime(&path, self.aged(days));
    }

    fn file_at(&self, dir: &Path, name: &str, modified: SystemTime) {
        let path = dir.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        set_mtime(&path, modified);
    }
}

fn set_mtime(path: &Path, modified: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_times(FileTimes::new().set_modified(modified))
        .unwrap();
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

#[test]
fn test_age_threshold_moves_old_files_only() {
    let fx = Fixture::new();
    for days in [0, 6, 7, 8, 30] {
        fx.file(&fx.source, &format!("app-{days}.log"), days);
    }

    let mut rule = fx.rule();
    rule.move_older_than_days = 7;

    let report = run_pass(&[rule], ArchiveAction::MoveToArchive, fx.reference());

    assert!(report.failures.is_empty());
    assert_eq!(report.moved.len(), 3);
    assert_eq!(listing(&fx.source), vec!["app-0.log", "app-6.log"]);
    assert_eq!(
        listing(&fx.archive),
        vec!["app-30.log", "app-7.log", "app-8.log"]
    );
}

#[test]
fn test_count_threshold_keeps_newest() {
    let fx = Fixture::new();
    for (index, name) in ["a.log", "b.log", "c.log", "d.log", "e.log"].iter().enumerate() {
        // a is newest, e is oldest; none reach the age threshold
        fx.file_at(
            &fx.source,
            name,
            fx.aged(0) - Duration::from_secs(60 * (index as u64 + 1)),
        );
    }

    let mut rule = fx.rule();
    rule.move_older_than_days = 7;
    rule.move_after_reaching_count = Some(2);

    let report = run_pass(&[rule], ArchiveAction::MoveToArchive, fx.reference());

    assert!(report.failures.is_empty());
    assert_eq!(listing(&fx.source), vec!["a.log", "b.log"]);
    assert_eq!(listing(&fx.archive), vec!["c.log", "d.log", "e.log"]);
}

#[test]
fn test_count_threshold_only_counts_matching_entries() {
    let fx = Fixture::new();
    for (index, name) in ["1.log", "2.log", "3.log", "keep.txt", "keep2.txt"]
        .iter()
        .enumerate()
    {
        fx.file_at(&fx.source, name, fx.aged(1) - Duration::from_secs(index as u64));
    }

    let mut rule = fx.rule();
    rule.name_patterns = vec!["*.log".to_string()];
    rule.move_after_reaching_count = Some(1);

    run_pass(&[rule], ArchiveAction::MoveToArchive, fx.reference());

    assert_eq!(listing(&fx.source), vec!["1.log", "keep.txt", "keep2.txt"]);
    assert_eq!(listing(&fx.archive), vec!["2.log", "3.log"]);
}

#[test]
fn test_subdirectory_mode_moves_whole_tree() {
    let fx = Fixture::new();
    let run = fx.source.join("run-2024-01-01");
    fs::create_dir_all(run.join("nested/deeper")).unwrap();
    fs::write(run.join("top.log"), b"top").unwrap();
    fs::write(run.join("nested/mid.log"), b"mid").unwrap();
    fs::write(run.join("nested/deeper/bottom.log"), b"bottom").unwrap();
    fs::write(fx.source.join("loose.log"), b"ignored in directory mode").unwrap();

    let dir = File::open(&run).unwrap();
    dir.set_times(FileTimes::new().set_modified(fx.aged(10))).unwrap();
    drop(dir);

    let mut rule = fx.rule();
    rule.monitoring_mode = MonitoringMode::SubdirectoriesOnly;

    let report = run_pass(&[rule], ArchiveAction::MoveToArchive, fx.reference());

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert!(!run.exists());
    assert_eq!(listing(&fx.source), vec!["loose.log"]);

    let moved = fx.archive.join("run-2024-01-01");
    assert_eq!(fs::read(moved.join("top.log")).unwrap(), b"top");
    assert_eq!(fs::read(moved.join("nested/mid.log")).unwrap(), b"mid");
    assert_eq!(
        fs::read(moved.join("nested/deeper/bottom.log")).unwrap(),
        b"bottom"
    );
}

#[test]
fn test_second_pass_is_idempotent() {
    let fx = Fixture::new();
    for days in [1, 9, 12] {
        fx.file(&fx.source, &format!("svc-{days}.log"), days);
    }

    let rules = vec![fx.rule()];
    let first = run_pass(&rules, ArchiveAction::MoveToArchive, fx.reference());
    let second = run_pass(&rules, ArchiveAction::MoveToArchive, fx.reference());

    assert_eq!(first.moved.len(), 2);
    assert!(second.moved.is_empty());
    assert!(second.failures.is_empty());
    assert_eq!(listing(&fx.archive), vec!["svc-12.log", "svc-9.log"]);
}

#[test]
fn test_name_collision_across_runs_is_disambiguated() {
    let fx = Fixture::new();
    let rules = vec![fx.rule()];

    fx.file(&fx.source, "app.log", 10);
    run_pass(&rules, ArchiveAction::MoveToArchive, fx.reference());

    fx.file(&fx.source, "app.log", 8);
    let report = run_pass(&rules, ArchiveAction::MoveToArchive, fx.reference());

    assert_eq!(report.moved.len(), 1);
    assert_eq!(report.moved[0].to, fx.archive.join("app.1.log"));
    assert_eq!(listing(&fx.archive), vec!["app.1.log", "app.log"]);
    assert!(listing(&fx.source).is_empty());
}

#[test]
fn test_delete_pass_purges_archive() {
    let fx = Fixture::new();
    fs::create_dir_all(&fx.archive).unwrap();
    for days in [5, 29, 30, 45] {
        fx.file(&fx.archive, &format!("old-{days}.log"), days);
    }
    fx.file(&fx.source, "old-source.log", 90);

    let mut rule = fx.rule();
    rule.delete_older_than_days = 30;

    let report = run_pass(&[rule], ArchiveAction::DeleteFromArchive, fx.reference());

    assert_eq!(report.removed.len(), 2);
    assert_eq!(listing(&fx.archive), vec!["old-29.log", "old-5.log"]);
    // Delete never touches the source
    assert_eq!(listing(&fx.source), vec!["old-source.log"]);
}

#[test]
fn test_delete_pass_removes_directory_trees() {
    let fx = Fixture::new();
    let stale = fx.archive.join("stale-run");
    fs::create_dir_all(stale.join("a/b")).unwrap();
    fs::write(stale.join("a/b/c.log"), b"c").unwrap();
    let dir = File::open(&stale).unwrap();
    dir.set_times(FileTimes::new().set_modified(fx.aged(60))).unwrap();
    drop(dir);
    fs::create_dir_all(fx.archive.join("fresh-run")).unwrap();

    let mut rule = fx.rule();
    rule.monitoring_mode = MonitoringMode::SubdirectoriesOnly;

    let report = run_pass(&[rule], ArchiveAction::DeleteFromArchive, fx.reference());

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.removed, vec![stale.clone()]);
    assert_eq!(listing(&fx.archive), vec!["fresh-run"]);
}

#[test]
fn test_missing_source_is_not_a_failure() {
    let fx = Fixture::new();
    fs::remove_dir_all(&fx.source).unwrap();

    let report = run_pass(&[fx.rule()], ArchiveAction::MoveToArchive, fx.reference());

    assert!(report.failures.is_empty());
    assert!(report.moved.is_empty());
    assert!(fx.source.is_dir());
    assert!(fx.archive.is_dir());
}

#[test]
fn test_rules_run_in_order_over_shared_archive() {
    let fx = Fixture::new();
    let other_source = fx.source.parent().unwrap().join("other-logs");
    fs::create_dir_all(&other_source).unwrap();

    fx.file(&fx.source, "shared.log", 10);
    fx.file(&other_source, "shared.log", 10);

    let rules = vec![fx.rule(), RetentionRule::new(&other_source, &fx.archive)];
    let report = run_pass(&rules, ArchiveAction::MoveToArchive, fx.reference());

    assert_eq!(report.moved.len(), 2);
    assert_eq!(report.moved[0].from, fx.source.join("shared.log"));
    assert_eq!(report.moved[1].to, fx.archive.join("shared.1.log"));
}
