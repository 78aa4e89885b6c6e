//! Cross-process locking built on exclusive file creation.
//!
//! The result set is shared by every test process on the machine, so each
//! read-modify-write of it runs while holding a *lock marker*: a zero-byte
//! file whose creation with `create_new` either succeeds atomically or fails
//! because another process holds it. No OS advisory locking is involved, so
//! the protocol works on any local filesystem that honors exclusive create.
//!
//! # Retry Budget
//!
//! A failed attempt (marker exists, or any other I/O error) is followed by a
//! fixed delay of [`lock_retry_delay`], and the attempt is repeated up to
//! [`LOCK_ATTEMPTS`] times. When the budget runs out nothing is executed and
//! [`LockOutcome::Exhausted`] is returned. That is not an error unless the
//! caller asks for one with [`LockOutcome::require`].
//!
//! # Abandoned Markers
//!
//! A process that crashes while holding the lock leaves its marker behind.
//! A marker older than [`lock_stale_after`] is reclaimed by the next process
//! that finds it. Reclaiming is itself serialized through a second exclusive
//! marker (`<lock>.break`) so two contenders can never both delete a marker
//! and both win the re-create.
//!
//! # Example
//!
//! ```rust,no_run
//! use covmerge::cache::LockManager;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let lock = LockManager::new(Path::new("coverage/resultset.yml.lck"));
//! let outcome = lock.with_lock(|| {
//!     // exclusive with every other process using the same marker
//!     Ok(42)
//! })?;
//! if let Some(value) = outcome.into_option() {
//!     assert_eq!(value, 42);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`lock_retry_delay`]: crate::constants::lock_retry_delay
//! [`lock_stale_after`]: crate::constants::lock_stale_after
//! [`LOCK_ATTEMPTS`]: crate::constants::LOCK_ATTEMPTS

use crate::constants::{LOCK_ATTEMPTS, LOCK_SUFFIX, lock_retry_delay, lock_stale_after};
use crate::core::MergeError;
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Result of running a critical section under the lock.
///
/// Kept apart from the critical section's own `Result`: an error raised
/// inside the lock propagates as `Err`, while failing to get the lock at all
/// is reported here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum LockOutcome<T> {
    /// The lock was held and the critical section ran to completion
    Ran(T),
    /// Every attempt failed; nothing was executed
    Exhausted {
        /// Path of the lock marker
        path: PathBuf,
        /// Number of attempts made
        attempts: u32,
    },
}

impl<T> LockOutcome<T> {
    /// Whether the critical section ran
    pub fn ran(&self) -> bool {
        matches!(self, Self::Ran(_))
    }

    /// The critical section's value, or `None` if it never ran
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Ran(value) => Some(value),
            Self::Exhausted { .. } => None,
        }
    }

    /// Map the value of a critical section that ran
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LockOutcome<U> {
        match self {
            Self::Ran(value) => LockOutcome::Ran(f(value)),
            Self::Exhausted { path, attempts } => LockOutcome::Exhausted { path, attempts },
        }
    }

    /// Strict form: an exhausted budget becomes [`MergeError::LockExhausted`]
    pub fn require(self) -> Result<T> {
        match self {
            Self::Ran(value) => Ok(value),
            Self::Exhausted { path, attempts } => {
                Err(MergeError::LockExhausted { path, attempts }.into())
            }
        }
    }
}

/// Acquires the lock marker at a fixed path.
///
/// Cheap to clone and holds no state between calls; two managers pointing at
/// the same path exclude each other exactly like two processes do.
#[derive(Debug, Clone)]
pub struct LockManager {
    lock_path: PathBuf,
    attempts: u32,
    retry_delay: Duration,
    stale_after: Duration,
}

impl LockManager {
    /// Create a manager for the marker at `lock_path` with the standard budget.
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            attempts: LOCK_ATTEMPTS,
            retry_delay: lock_retry_delay(),
            stale_after: lock_stale_after(),
        }
    }

    /// Create a manager guarding `file`, using `<file>.lck` as the marker.
    pub fn for_file(file: &Path) -> Self {
        Self::new(sibling_with_suffix(file, LOCK_SUFFIX))
    }

    /// Override the retry budget.
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn with_budget(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.attempts = attempts;
        self.retry_delay = retry_delay;
        self
    }

    /// Override the age after which a marker counts as abandoned.
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Path of the lock marker
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay slept after each failed attempt
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Run `critical_section` while holding the lock.
    ///
    /// The marker is removed when the critical section returns, whether it
    /// returned `Ok`, `Err`, or panicked.
    ///
    /// # Returns
    ///
    /// - `Ok(LockOutcome::Ran(value))` if the critical section ran and succeeded
    /// - `Ok(LockOutcome::Exhausted { .. })` if the lock was never obtained
    /// - `Err(_)` with the critical section's own error
    pub fn with_lock<T, F>(&self, critical_section: F) -> Result<LockOutcome<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let start = Instant::now();

        for attempt in 1..=self.attempts {
            match self.try_acquire() {
                Ok(guard) => {
                    debug!(
                        lock = %self.lock_path.display(),
                        attempt,
                        wait_ms = start.elapsed().as_millis(),
                        "Result set lock acquired"
                    );
                    let result = critical_section();
                    drop(guard);
                    return result.map(LockOutcome::Ran);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(
                        lock = %self.lock_path.display(),
                        attempt,
                        "Lock held by another process, retrying"
                    );
                }
                Err(e) => {
                    warn!(
                        lock = %self.lock_path.display(),
                        attempt,
                        error = %e,
                        "Unexpected error creating lock marker, retrying"
                    );
                }
            }
            std::thread::sleep(self.retry_delay);
        }

        warn!(
            lock = %self.lock_path.display(),
            attempts = self.attempts,
            wait_ms = start.elapsed().as_millis(),
            "Giving up on result set lock; operation skipped"
        );
        Ok(LockOutcome::Exhausted {
            path: self.lock_path.clone(),
            attempts: self.attempts,
        })
    }

    /// Make a single attempt at creating the marker.
    ///
    /// An abandoned marker is reclaimed first, within the same attempt.
    ///
    /// # Errors
    ///
    /// `ErrorKind::AlreadyExists` when another process holds the lock; any
    /// other I/O error unchanged.
    pub fn try_acquire(&self) -> io::Result<LockGuard> {
        let err = match self.create_marker() {
            Ok(guard) => return Ok(guard),
            Err(e) => e,
        };

        if err.kind() == ErrorKind::AlreadyExists && self.reclaim_if_stale()? {
            return self.create_marker();
        }
        Err(err)
    }

    fn create_marker(&self) -> io::Result<LockGuard> {
        let file = create_exclusive(&self.lock_path)?;
        let created = file.metadata().and_then(|m| m.modified()).ok();
        Ok(LockGuard {
            path: self.lock_path.clone(),
            marker_modified: created,
            acquired_at: Instant::now(),
        })
    }

    /// Remove the marker if it is older than the stale threshold.
    ///
    /// Returns `true` when the marker is gone and creation should be retried
    /// right away.
    fn reclaim_if_stale(&self) -> io::Result<bool> {
        match marker_age(&self.lock_path) {
            Ok(age) if age <= self.stale_after => return Ok(false),
            Ok(_) => {}
            // Released between our create and this check
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        }

        let break_path = sibling_with_suffix(&self.lock_path, ".break");
        if create_exclusive(&break_path).is_err() {
            // Another process is reclaiming; a leftover break marker from a
            // crashed reclaimer is only honored for the stale window.
            match marker_age(&break_path) {
                Ok(age) if age > self.stale_after => {
                    let _ = fs::remove_file(&break_path);
                }
                _ => {}
            }
            return Ok(false);
        }

        let result = match marker_age(&self.lock_path) {
            Ok(age) if age > self.stale_after => {
                warn!(
                    lock = %self.lock_path.display(),
                    age_secs = age.as_secs(),
                    "Removing abandoned lock marker"
                );
                match fs::remove_file(&self.lock_path) {
                    Ok(()) => Ok(true),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
                    Err(e) => Err(e),
                }
            }
            Ok(_) => Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e),
        };

        let _ = fs::remove_file(&break_path);
        result
    }
}

/// A held lock marker; dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    marker_modified: Option<SystemTime>,
    acquired_at: Instant,
}

impl LockGuard {
    /// Path of the held marker
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // A holder slow enough to have its marker reclaimed must not delete
        // the marker of the process that took over.
        if let Some(expected) = self.marker_modified {
            match fs::metadata(&self.path).and_then(|m| m.modified()) {
                Ok(current) if current != expected => {
                    warn!(
                        lock = %self.path.display(),
                        held_ms = self.acquired_at.elapsed().as_millis(),
                        "Lock marker was reclaimed while held; leaving the new owner's marker"
                    );
                    return;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(lock = %self.path.display(), "Lock marker vanished while held");
                    return;
                }
                _ => {}
            }
        }

        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(lock = %self.path.display(), error = %e, "Failed to remove lock marker");
            }
        }
        debug!(
            lock = %self.path.display(),
            held_ms = self.acquired_at.elapsed().as_millis(),
            "Result set lock released"
        );
    }
}

fn create_exclusive(path: &Path) -> io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn marker_age(path: &Path) -> io::Result<Duration> {
    let modified = fs::metadata(path)?.modified()?;
    // Clock skew can put the mtime in the future; treat that as brand new
    Ok(SystemTime::now().duration_since(modified).unwrap_or_default())
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
