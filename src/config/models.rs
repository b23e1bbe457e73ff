use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pattern used when a rule lists no name patterns.
pub const MATCH_ALL_PATTERN: &str = "*";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Archive processor configuration: timer settings plus the ordered rule list
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorConfig {
    /// When false, passes only run through manual triggers
    #[serde(default = "default_auto_timer_enabled")]
    pub auto_timer_enabled: bool,
    /// Run the first automatic pass after `startup_delay` instead of a full interval
    #[serde(default)]
    pub archive_on_startup: bool,
    #[serde(default = "default_startup_delay")]
    pub startup_delay: HumanDuration,
    #[serde(default = "default_auto_interval")]
    pub auto_interval: HumanDuration,
    /// Rules run in this order within a single command
    #[serde(default)]
    pub rules: Vec<RetentionRule>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            auto_timer_enabled: default_auto_timer_enabled(),
            archive_on_startup: false,
            startup_delay: default_startup_delay(),
            auto_interval: default_auto_interval(),
            rules: Vec::new(),
        }
    }
}

fn default_auto_timer_enabled() -> bool {
    true
}

fn default_startup_delay() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_auto_interval() -> HumanDuration {
    HumanDuration::from_secs(24 * 60 * 60)
}

/// Whether a rule selects files or immediate subdirectories of the scanned location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    #[default]
    FilesOnly,
    SubdirectoriesOnly,
}

/// One source/archive pairing plus its age and count thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionRule {
    pub source_path: PathBuf,
    pub archive_path: PathBuf,
    #[serde(default)]
    pub monitoring_mode: MonitoringMode,
    /// Glob patterns matched against entry names; empty means everything
    #[serde(default)]
    pub name_patterns: Vec<String>,
    #[serde(default = "default_use_utc_time")]
    pub use_utc_time: bool,
    #[serde(default = "default_move_older_than_days")]
    pub move_older_than_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_after_reaching_count: Option<u32>,
    #[serde(default = "default_delete_older_than_days")]
    pub delete_older_than_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_after_reaching_count: Option<u32>,
}

impl RetentionRule {
    /// Rule with default thresholds for the given locations
    pub fn new(source_path: impl Into<PathBuf>, archive_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            archive_path: archive_path.into(),
            monitoring_mode: MonitoringMode::default(),
            name_patterns: Vec::new(),
            use_utc_time: default_use_utc_time(),
            move_older_than_days: default_move_older_than_days(),
            move_after_reaching_count: None,
            delete_older_than_days: default_delete_older_than_days(),
            delete_after_reaching_count: None,
        }
    }

    /// Configured patterns, or the single match-all pattern when none are set
    pub fn effective_patterns(&self) -> Vec<&str> {
        if self.name_patterns.is_empty() {
            vec![MATCH_ALL_PATTERN]
        } else {
            self.name_patterns.iter().map(String::as_str).collect()
        }
    }

    /// Resolve relative source/archive paths against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.source_path.is_relative() {
            self.source_path = base.join(&self.source_path);
        }
        if self.archive_path.is_relative() {
            self.archive_path = base.join(&self.archive_path);
        }
    }
}

fn default_use_utc_time() -> bool {
    true
}

fn default_move_older_than_days() -> u32 {
    7
}

fn default_delete_older_than_days() -> u32 {
    30
}

/// Logging configuration for the host binary
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.processor.auto_timer_enabled);
        assert!(!config.processor.archive_on_startup);
        assert_eq!(config.processor.startup_delay.as_duration().as_secs(), 30);
        assert_eq!(config.processor.auto_interval.as_duration().as_secs(), 86_400);
        assert!(config.processor.rules.is_empty());
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_rule_defaults_from_toml() {
        let rule: RetentionRule = toml::from_str(
            r#"
source_path = "/var/log/app"
archive_path = "/var/log/app/archive"
            "#,
        )
        .unwrap();

        assert_eq!(rule.monitoring_mode, MonitoringMode::FilesOnly);
        assert!(rule.use_utc_time);
        assert_eq!(rule.move_older_than_days, 7);
        assert_eq!(rule.delete_older_than_days, 30);
        assert_eq!(rule.move_after_reaching_count, None);
        assert_eq!(rule.delete_after_reaching_count, None);
    }

    #[test]
    fn test_effective_patterns() {
        let mut rule = RetentionRule::new("/src", "/dst");
        assert_eq!(rule.effective_patterns(), vec!["*"]);

        rule.name_patterns = vec!["*.log".to_string(), "*.txt".to_string()];
        assert_eq!(rule.effective_patterns(), vec!["*.log", "*.txt"]);
    }

    #[test]
    fn test_resolve_paths_keeps_absolute() {
        let mut rule = RetentionRule::new("logs", "/abs/archive");
        rule.resolve_paths(Path::new("/base"));

        assert_eq!(rule.source_path, PathBuf::from("/base/logs"));
        assert_eq!(rule.archive_path, PathBuf::from("/abs/archive"));
    }

    #[test]
    fn test_monitoring_mode_names() {
        let rule: RetentionRule = toml::from_str(
            r#"
source_path = "/a"
archive_path = "/b"
monitoring_mode = "subdirectories_only"
            "#,
        )
        .unwrap();
        assert_eq!(rule.monitoring_mode, MonitoringMode::SubdirectoriesOnly);
    }
}
