//! Whole-file access to the persisted result set.
//!
//! [`ResultSetStore`] never touches the cache file without holding the lock
//! marker, and never writes it other than by replacing it in full through
//! [`atomic_write`].

use crate::cache::lock::{LockManager, LockOutcome};
use crate::cache::resultset::ResultSet;
use crate::constants::RESULTSET_FILENAME;
use crate::utils::fs::{atomic_write, ensure_parent_dir, read_text_file_if_exists};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads and writes the result set file under the cross-process lock.
#[derive(Debug, Clone)]
pub struct ResultSetStore {
    resultset_path: PathBuf,
    lock: LockManager,
}

impl ResultSetStore {
    /// Store for `<coverage_dir>/resultset.yml`
    pub fn new(coverage_dir: impl AsRef<Path>) -> Self {
        Self::at_path(coverage_dir.as_ref().join(RESULTSET_FILENAME))
    }

    /// Store for an explicit result set file
    pub fn at_path(resultset_path: impl Into<PathBuf>) -> Self {
        let resultset_path = resultset_path.into();
        let lock = LockManager::for_file(&resultset_path);
        Self {
            resultset_path,
            lock,
        }
    }

    /// Replace the lock manager, e.g. one with a shorter test budget
    #[must_use]
    pub fn with_lock_manager(mut self, lock: LockManager) -> Self {
        self.lock = lock;
        self
    }

    /// Path of the result set file
    pub fn resultset_path(&self) -> &Path {
        &self.resultset_path
    }

    /// Path of the lock marker
    pub fn lock_path(&self) -> &Path {
        self.lock.lock_path()
    }

    /// The lock manager guarding the file
    pub fn lock_manager(&self) -> &LockManager {
        &self.lock
    }

    /// Raw content of the cache file, read under the lock.
    ///
    /// `Ran(None)` means the file does not exist.
    pub fn read(&self) -> Result<LockOutcome<Option<String>>> {
        ensure_parent_dir(&self.resultset_path)?;
        self.lock.with_lock(|| self.read_unlocked())
    }

    /// Replace the cache file with `content`, under the lock.
    pub fn write(&self, content: &str) -> Result<LockOutcome<()>> {
        ensure_parent_dir(&self.resultset_path)?;
        self.lock.with_lock(|| self.write_unlocked(content))
    }

    /// Load and parse the stored result set.
    ///
    /// A missing file, an empty file, and an exhausted lock budget all yield
    /// an empty set. Unparseable content is an error.
    pub fn resultset(&self) -> Result<ResultSet> {
        match self.read()? {
            LockOutcome::Ran(Some(content)) => Ok(ResultSet::from_yaml(
                &content,
                &self.resultset_path,
            )?),
            LockOutcome::Ran(None) => {
                debug!(path = %self.resultset_path.display(), "No result set stored yet");
                Ok(ResultSet::new())
            }
            LockOutcome::Exhausted { attempts, .. } => {
                warn!(
                    path = %self.resultset_path.display(),
                    attempts,
                    "Could not lock result set for reading; treating it as empty"
                );
                Ok(ResultSet::new())
            }
        }
    }

    /// Load, modify, and write back the result set in one lock acquisition.
    ///
    /// Nothing is written if `f` is never called because the lock could not
    /// be obtained, or if loading fails.
    pub fn update<T, F>(&self, f: F) -> Result<LockOutcome<T>>
    where
        F: FnOnce(&mut ResultSet) -> T,
    {
        ensure_parent_dir(&self.resultset_path)?;
        self.lock.with_lock(|| {
            let mut set = self.load_unlocked()?;
            let value = f(&mut set);
            let content = set.to_yaml(&self.resultset_path)?;
            self.write_unlocked(&content)?;
            Ok(value)
        })
    }

    fn read_unlocked(&self) -> Result<Option<String>> {
        read_text_file_if_exists(&self.resultset_path).with_context(|| {
            format!("Failed to read result set: {}", self.resultset_path.display())
        })
    }

    fn load_unlocked(&self) -> Result<ResultSet> {
        match self.read_unlocked()? {
            Some(content) => Ok(ResultSet::from_yaml(&content, &self.resultset_path)?),
            None => Ok(ResultSet::new()),
        }
    }

    fn write_unlocked(&self, content: &str) -> Result<()> {
        atomic_write(&self.resultset_path, content.as_bytes()).with_context(|| {
            format!("Failed to write result set: {}", self.resultset_path.display())
        })?;
        debug!(
            path = %self.resultset_path.display(),
            bytes = content.len(),
            "Result set written"
        );
        Ok(())
    }
}
