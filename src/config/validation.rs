use super::models::{MonitoringMode, ProcessorConfig, RetentionRule};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Rule #{rule}: {field} is empty")]
    EmptyPath { rule: usize, field: &'static str },

    #[error("Rule #{rule}: {field} '{path}' is not absolute")]
    RelativePath {
        rule: usize,
        field: &'static str,
        path: String,
    },

    #[error("Rule #{rule}: source and archive paths overlap ('{source_path}' / '{archive_path}')")]
    OverlappingPaths {
        rule: usize,
        source_path: String,
        archive_path: String,
    },

    #[error("Rule #{rule}: invalid name pattern '{pattern}': {message}")]
    InvalidPattern {
        rule: usize,
        pattern: String,
        message: String,
    },

    #[error("auto_interval must be positive")]
    ZeroInterval,
}

/// Validate the processor configuration
pub fn validate(config: &ProcessorConfig) -> Result<(), ValidationError> {
    validate_schedule(config)?;
    for (index, rule) in config.rules.iter().enumerate() {
        validate_rule(index, rule)?;
    }
    Ok(())
}

fn validate_schedule(config: &ProcessorConfig) -> Result<(), ValidationError> {
    if config.auto_timer_enabled && config.auto_interval.is_zero() {
        return Err(ValidationError::ZeroInterval);
    }
    Ok(())
}

fn validate_rule(index: usize, rule: &RetentionRule) -> Result<(), ValidationError> {
    validate_path(index, "source_path", &rule.source_path)?;
    validate_path(index, "archive_path", &rule.archive_path)?;

    // An archive below the source is only safe when subdirectories are never candidates.
    let source_in_archive = rule.source_path.starts_with(&rule.archive_path);
    let archive_in_source = rule.archive_path.starts_with(&rule.source_path);
    let overlaps = source_in_archive
        || (archive_in_source && rule.monitoring_mode == MonitoringMode::SubdirectoriesOnly);

    if overlaps {
        return Err(ValidationError::OverlappingPaths {
            rule: index,
            source_path: rule.source_path.display().to_string(),
            archive_path: rule.archive_path.display().to_string(),
        });
    }

    for pattern in &rule.name_patterns {
        glob::Pattern::new(pattern).map_err(|e| ValidationError::InvalidPattern {
            rule: index,
            pattern: pattern.clone(),
            message: e.msg.to_string(),
        })?;
    }

    Ok(())
}

fn validate_path(index: usize, field: &'static str, path: &Path) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath { rule: index, field });
    }
    if !path.is_absolute() {
        return Err(ValidationError::RelativePath {
            rule: index,
            field,
            path: path.display().to_string(),
        });
    }
    Ok(())
}
