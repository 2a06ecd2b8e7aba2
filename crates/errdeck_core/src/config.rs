//! Engine configuration.
//!
//! # Responsibility
//! - Describe storage, logging and notification defaults in one place.
//! - Load them from TOML and reject values the engine cannot run with.
//!
//! # Invariants
//! - Every field has a default; an empty file is a valid config.
//! - Unknown keys are rejected so typos do not silently fall back.

use crate::db::DbOptions;
use crate::logging::default_log_level;
use crate::model::app::DEFAULT_EMAIL_AT_NOTICES;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DB_FILE_NAME: &str = "errdeck.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Runtime configuration for the errdeck engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite database file shared by all workers.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    /// Thresholds given to apps created without explicit ones.
    pub default_email_at_notices: Vec<u32>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            default_email_at_notices: DEFAULT_EMAIL_AT_NOTICES.to_vec(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".to_string()));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_email_at_notices.is_empty() {
            return Err(ConfigError::Invalid(
                "default_email_at_notices must not be empty".to_string(),
            ));
        }
        if self.default_email_at_notices.contains(&0) {
            return Err(ConfigError::Invalid(
                "default_email_at_notices values must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.default_email_at_notices, vec![1, 10, 100]);
    }

    #[test]
    fn fields_override_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
db_path = "/var/lib/errdeck/errdeck.sqlite3"
log_level = "warn"
log_dir = "/var/log/errdeck"
busy_timeout_ms = 250
default_email_at_notices = [1, 5]
"#,
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/errdeck/errdeck.sqlite3"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/errdeck")));
        assert_eq!(config.db_options().busy_timeout, Duration::from_millis(250));
        assert_eq!(config.default_email_at_notices, vec![1, 5]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CoreConfig::from_toml_str("db_pth = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let err = CoreConfig::from_toml_str("busy_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_threshold_is_invalid() {
        let err = CoreConfig::from_toml_str("default_email_at_notices = [0, 10]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
