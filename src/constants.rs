//! Global constants used throughout the covmerge codebase.
//!
//! Lock retry budget, file names, and default thresholds shared by the cache
//! and merger modules. Every process taking part in a merge must agree on
//! these values.

use std::time::Duration;

/// File name of the persisted result set inside the coverage directory.
pub const RESULTSET_FILENAME: &str = "resultset.yml";

/// Suffix appended to the result set path to form the lock marker path.
pub const LOCK_SUFFIX: &str = ".lck";

/// Number of attempts made to create the lock marker before giving up.
///
/// Exhausting the budget is not an error: the critical section is simply
/// skipped. See [`crate::cache::LockOutcome`].
pub const LOCK_ATTEMPTS: u32 = 5;

/// Fixed delay slept after each failed lock attempt (1 second).
pub fn lock_retry_delay() -> Duration {
    Duration::from_secs(1)
}

/// Age after which an existing lock marker is considered abandoned (10 minutes).
///
/// A holder only keeps the marker for one read-modify-write of the result set,
/// so a marker this old belongs to a process that crashed while holding it.
pub fn lock_stale_after() -> Duration {
    Duration::from_secs(600)
}

/// Default staleness threshold for stored results (600 seconds).
///
/// Results older than this are left out of the merged result.
pub fn default_merge_timeout() -> Duration {
    Duration::from_secs(600)
}

/// Default directory holding the result set, relative to the working directory.
pub const DEFAULT_COVERAGE_DIR: &str = "coverage";

/// Separator used when joining command names into a merged name.
pub const COMMAND_NAME_SEPARATOR: &str = ", ";
