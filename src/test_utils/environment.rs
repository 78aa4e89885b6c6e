//! Test environment owning a temporary coverage directory.

use crate::cache::{LockManager, ResultSetStore};
use crate::config::MergeConfig;
use crate::constants::default_merge_timeout;
use crate::merger::Merger;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Isolated coverage directory plus ready-made stores and mergers over it.
///
/// The directory is removed when the environment is dropped.
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub coverage_dir: PathBuf,
}

impl TestEnvironment {
    /// Create a fresh environment. The coverage directory itself is not
    /// created; the store creates it on first use.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let coverage_dir = temp_dir.path().join("coverage");
        Ok(Self {
            temp_dir,
            coverage_dir,
        })
    }

    /// Configuration pointing at this environment
    pub fn config(&self) -> MergeConfig {
        MergeConfig {
            coverage_dir: self.coverage_dir.clone(),
            merge_timeout: default_merge_timeout(),
        }
    }

    /// Store with the default lock budget
    pub fn store(&self) -> ResultSetStore {
        ResultSetStore::new(&self.coverage_dir)
    }

    /// Store whose lock gives up after `attempts` tries `retry_delay` apart
    pub fn store_with_budget(&self, attempts: u32, retry_delay: Duration) -> ResultSetStore {
        let store = self.store();
        let lock = LockManager::for_file(store.resultset_path()).with_budget(attempts, retry_delay);
        store.with_lock_manager(lock)
    }

    /// Merger with the default lock budget and merge timeout
    pub fn merger(&self) -> Merger {
        Merger::new(&self.config())
    }

    /// Merger over [`store_with_budget`](Self::store_with_budget)
    pub fn merger_with_budget(&self, attempts: u32, retry_delay: Duration) -> Merger {
        Merger::with_store(self.store_with_budget(attempts, retry_delay), default_merge_timeout())
    }

    /// Path of the result set file
    pub fn resultset_path(&self) -> PathBuf {
        self.config().resultset_path()
    }

    /// Path of the lock marker
    pub fn lock_path(&self) -> PathBuf {
        self.store().lock_path().to_path_buf()
    }

    /// Whether the result set file exists
    pub fn resultset_exists(&self) -> bool {
        self.resultset_path().exists()
    }

    /// Raw result set content
    pub fn read_resultset(&self) -> Result<String> {
        let path = self.resultset_path();
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read result set: {}", path.display()))
    }

    /// Overwrite the result set file directly, bypassing the lock
    pub fn write_resultset(&self, content: &str) -> Result<()> {
        fs::create_dir_all(&self.coverage_dir)?;
        let path = self.resultset_path();
        fs::write(&path, content)
            .with_context(|| format!("Failed to write result set: {}", path.display()))
    }

    /// Create a lock marker directly, as a crashed or busy process would leave it
    pub fn plant_lock_marker(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.coverage_dir)?;
        let path = self.lock_path();
        fs::write(&path, b"").with_context(|| format!("Failed to plant {}", path.display()))?;
        Ok(path)
    }

    /// Root of the temporary directory
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }
}
