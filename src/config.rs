//! Migration configuration
//!
//! ```yaml
//! failure_policy: abort   # or `continue` (default)
//! dry_run: false
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What a batch does when one entity hits a store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and go on with the next candidate
    #[default]
    Continue,
    /// Record the failure and stop the batch
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Continue => f.write_str("continue"),
            FailurePolicy::Abort => f.write_str("abort"),
        }
    }
}

/// Driver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Batch behaviour on per-entity store failures
    pub failure_policy: FailurePolicy,
    /// Run every transaction but roll it back instead of committing
    pub dry_run: bool,
}

impl MigrationConfig {
    pub fn from_yaml_str(raw: &str) -> ConfigResult<Self> {
        // An empty document means "all defaults"
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw)?;
        info!(
            "Loaded config {:?}: failure_policy={}, dry_run={}",
            path, config.failure_policy, config.dry_run
        );
        Ok(config)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert!(!config.dry_run);
        assert_eq!(MigrationConfig::from_yaml_str("  \n").unwrap(), config);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = MigrationConfig::from_yaml_str("failure_policy: abort\n").unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err =
            MigrationConfig::from_yaml_str("failure_policy: abort\nretries: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = MigrationConfig::from_yaml_str("failure_policy: sometimes\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dry_run: true").unwrap();

        let config = MigrationConfig::from_yaml_file(file.path()).unwrap();
        assert!(config.dry_run);

        let missing = MigrationConfig::from_yaml_file("/nonexistent/aliasgraph.yaml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
