//! Configuration for where results are cached and how long they stay mergeable.
//!
//! Settings come from an optional TOML file and two environment overrides.
//!
//! # Resolution
//!
//! 1. The file named by `COVMERGE_CONFIG`, or `.covmerge.toml` in the current
//!    directory. A missing file means defaults.
//! 2. `COVMERGE_COVERAGE_DIR` and `COVMERGE_MERGE_TIMEOUT` (seconds) replace
//!    the corresponding file values.
//!
//! # File Format
//!
//! ```toml
//! coverage_dir = "target/coverage"
//! merge_timeout = 3600
//! ```

use crate::constants::{DEFAULT_COVERAGE_DIR, RESULTSET_FILENAME, default_merge_timeout};
use crate::core::MergeError;
use crate::utils::fs::read_text_file_if_exists;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "COVMERGE_CONFIG";
/// Environment variable overriding [`MergeConfig::coverage_dir`]
pub const COVERAGE_DIR_ENV: &str = "COVMERGE_COVERAGE_DIR";
/// Environment variable overriding [`MergeConfig::merge_timeout`], in seconds
pub const MERGE_TIMEOUT_ENV: &str = "COVMERGE_MERGE_TIMEOUT";
/// Config file looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = ".covmerge.toml";

/// Settings for storing and merging coverage results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Directory holding the result set file and its lock marker
    pub coverage_dir: PathBuf,

    /// Results older than this are left out of merges
    #[serde(with = "seconds")]
    pub merge_timeout: Duration,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            coverage_dir: PathBuf::from(DEFAULT_COVERAGE_DIR),
            merge_timeout: default_merge_timeout(),
        }
    }
}

impl MergeConfig {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// [`MergeError::ConfigInvalid`] if the file or an override cannot be
    /// parsed, [`MergeError::StoreIo`] if the file exists but cannot be read.
    pub fn load() -> Result<Self> {
        Self::load_with_env(|key| std::env::var(key).ok())
    }

    /// Resolve configuration using `lookup` in place of the environment.
    pub fn load_with_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = lookup(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::load_from(&path)?;

        if let Some(dir) = lookup(COVERAGE_DIR_ENV) {
            config.coverage_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(MERGE_TIMEOUT_ENV) {
            let secs = raw.trim().parse::<u64>().map_err(|e| MergeError::ConfigInvalid {
                path: path.clone(),
                reason: format!("{MERGE_TIMEOUT_ENV}={raw:?}: {e}"),
            })?;
            config.merge_timeout = Duration::from_secs(secs);
        }

        debug!(
            coverage_dir = %config.coverage_dir.display(),
            merge_timeout_secs = config.merge_timeout.as_secs(),
            "Resolved merge configuration"
        );
        Ok(config)
    }

    /// Load from a TOML file, using defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let Some(content) = read_text_file_if_exists(path)? else {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        };

        let config = toml::from_str(&content).map_err(|e| MergeError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Path of the result set file inside [`coverage_dir`](Self::coverage_dir)
    pub fn resultset_path(&self) -> PathBuf {
        self.coverage_dir.join(RESULTSET_FILENAME)
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
