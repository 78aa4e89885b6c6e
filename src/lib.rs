//! covmerge - cross-process coverage result cache
//!
//! Test suites often run as several independent processes (unit tests,
//! integration tests, parallel shards) that each record coverage. This crate
//! lets every process drop its coverage into one shared file and lets a later
//! step merge everything recent into a single report.
//!
//! # Architecture Overview
//!
//! - Each result is keyed by the name of the command that produced it. Storing
//!   a result under an existing name replaces the previous one.
//! - All results live in one YAML file, `<coverage_dir>/resultset.yml`,
//!   read and replaced whole.
//! - Every access to that file goes through a lock marker created with an
//!   exclusive create. Acquisition is retried a fixed number of times; when
//!   the budget runs out the operation is skipped rather than failed.
//! - Results older than the merge timeout are ignored when merging but never
//!   deleted.
//!
//! # Core Modules
//!
//! - [`cache`] - lock marker, stored result set, and locked file access
//! - [`merger`] - freshness filtering and the merge of stored results
//! - [`coverage`] - coverage payloads and the line-hit merge
//! - [`config`] - coverage directory and merge timeout settings
//! - [`core`] - error types and user-facing error formatting
//! - [`utils`] - atomic writes and directory helpers
//! - [`constants`] - file names, lock budget, and default timeouts
//!
//! # Example
//!
//! ```rust,no_run
//! use covmerge::{CoverageData, CoverageResult, MergeConfig, Merger};
//!
//! # fn example() -> anyhow::Result<()> {
//! let merger = Merger::new(&MergeConfig::load()?);
//!
//! let coverage = CoverageData::new().with_file("src/parser.rs", vec![Some(2), None, Some(0)]);
//! merger.store_result(&CoverageResult::new("unit", coverage))?;
//!
//! let merged = merger.merged_result_now()?;
//! for (file, lines) in merged.coverage.files() {
//!     println!("{file}: {} lines", lines.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The crate logs through `tracing` and never installs a subscriber itself.
//! Lock retries and stale-entry filtering are logged at `debug`, skipped
//! operations at `warn`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod core;
pub mod coverage;
pub mod merger;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{LockManager, LockOutcome, ResultSet, ResultSetEntry, ResultSetStore};
pub use config::MergeConfig;
pub use crate::core::{MergeError, user_friendly_error};
pub use coverage::{CoverageData, CoverageResult, LineHits};
pub use merger::{Merger, merge_results};
