use super::models::Config;
use config::{ConfigError, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "LOGKEEPER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/logkeeper.toml";
const ENV_PREFIX: &str = "LOGKEEPER";
const ENV_SEPARATOR: &str = "__";

/// Path of the configuration file: `LOGKEEPER_CONFIG` or the default location
pub fn default_config_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    load_from_sources(default_config_path())
}

/// Load configuration from a specific path and environment, then resolve
/// relative rule paths against the file's directory
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    let base_dir = if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(
            File::from(config_path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );
        config_dir(&config_path)
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
        current_dir()
    };

    // LOGKEEPER__PROCESSOR__AUTO_INTERVAL -> processor.auto_interval
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;
    resolve_rule_paths(&mut config, &base_dir);
    Ok(config)
}

/// Resolve relative rule paths against `base_dir`
pub fn resolve_rule_paths(config: &mut Config, base_dir: &Path) {
    for rule in &mut config.processor.rules {
        rule.resolve_paths(base_dir);
    }
}

fn config_dir(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new(""));
    if parent.as_os_str().is_empty() {
        current_dir()
    } else if parent.is_absolute() {
        parent.to_path_buf()
    } else {
        current_dir().join(parent)
    }
}

fn current_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitoringMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert!(config.processor.rules.is_empty());
        assert_eq!(config.processor.auto_interval.as_duration().as_secs(), 86_400);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[processor]
archive_on_startup = true
startup_delay = "5s"
auto_interval = "1h"

[[processor.rules]]
source_path = "/var/log/app"
archive_path = "/var/log/app-archive"
name_patterns = ["*.log"]
move_older_than_days = 3
move_after_reaching_count = 10

[logging]
filter = "debug"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert!(config.processor.archive_on_startup);
        assert_eq!(config.processor.startup_delay.as_duration().as_secs(), 5);
        assert_eq!(config.processor.auto_interval.as_duration().as_secs(), 3_600);
        assert_eq!(config.processor.rules.len(), 1);

        let rule = &config.processor.rules[0];
        assert_eq!(rule.name_patterns, vec!["*.log"]);
        assert_eq!(rule.move_older_than_days, 3);
        assert_eq!(rule.move_after_reaching_count, Some(10));
        assert_eq!(rule.delete_older_than_days, 30);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_relative_paths_resolved_against_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[[processor.rules]]
source_path = "logs"
archive_path = "archive/logs"
monitoring_mode = "subdirectories_only"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        let rule = &config.processor.rules[0];
        assert_eq!(rule.source_path, temp_dir.path().join("logs"));
        assert_eq!(rule.archive_path, temp_dir.path().join("archive/logs"));
        assert_eq!(rule.monitoring_mode, MonitoringMode::SubdirectoriesOnly);
    }

    // Environment overrides are not exercised here: mutating the process
    // environment is unsafe with parallel tests.
}
