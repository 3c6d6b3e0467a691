//! Custom validation functions for configuration.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static LOG_LEVEL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new("^(?i)(trace|debug|info|warn|error)$").ok());

/// Validate a `tracing` level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let re = LOG_LEVEL
        .as_ref()
        .ok_or_else(|| ValidationError::new("invalid_regex"))?;
    if re.is_match(level) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate that a report directory is not an empty path.
pub fn validate_report_dir(dir: &PathBuf) -> Result<(), ValidationError> {
    if dir.as_os_str().is_empty() {
        Err(ValidationError::new("empty_report_dir"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels() {
        for level in ["trace", "DEBUG", "info", "warn", "error"] {
            assert!(validate_log_level(level).is_ok(), "{level}");
        }
        assert!(validate_log_level("verbose").is_err());
        assert!(validate_log_level("info,hyper=warn").is_err());
    }

    #[test]
    fn report_dir() {
        assert!(validate_report_dir(&PathBuf::new()).is_err());
        assert!(validate_report_dir(&PathBuf::from("bug_reports")).is_ok());
    }
}
