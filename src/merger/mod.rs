//! Storing one run's coverage and merging all fresh runs into one result.
//!
//! Two callers drive this module, usually from different processes:
//!
//! 1. Each finishing test process calls [`Merger::store_result`] with its own
//!    coverage. The stored set is loaded, the entry for the process's command
//!    name is replaced, and the set is written back, all under one lock.
//! 2. The reporting step calls [`Merger::merged_result`], which loads the set,
//!    drops entries older than the merge timeout, and folds the rest into one
//!    [`CoverageResult`] named after every contributing command.
//!
//! # Example
//!
//! ```rust,no_run
//! use covmerge::config::MergeConfig;
//! use covmerge::coverage::{CoverageData, CoverageResult};
//! use covmerge::merger::Merger;
//!
//! # fn example() -> anyhow::Result<()> {
//! let merger = Merger::new(&MergeConfig::load()?);
//!
//! let coverage = CoverageData::new().with_file("src/lib.rs", vec![Some(1), None, Some(0)]);
//! if !merger.store_result(&CoverageResult::new("unit", coverage))? {
//!     eprintln!("coverage not stored: result set stayed locked");
//! }
//!
//! let merged = merger.merged_result_now()?;
//! println!("merged {}", merged.command_name);
//! # Ok(())
//! # }
//! ```

pub mod loader;

pub use loader::{ResultLoader, is_fresh};

use crate::cache::ResultSetStore;
use crate::config::MergeConfig;
use crate::constants::COMMAND_NAME_SEPARATOR;
use crate::coverage::{CoverageData, CoverageResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stores and merges coverage results through the shared result set.
///
/// Holds only its configuration; every call reads the cache afresh.
#[derive(Debug, Clone)]
pub struct Merger {
    store: ResultSetStore,
    merge_timeout: Duration,
}

impl Merger {
    /// Merger for the cache and timeout in `config`
    pub fn new(config: &MergeConfig) -> Self {
        Self::with_store(ResultSetStore::new(&config.coverage_dir), config.merge_timeout)
    }

    /// Merger over an explicit store
    pub fn with_store(store: ResultSetStore, merge_timeout: Duration) -> Self {
        Self {
            store,
            merge_timeout,
        }
    }

    /// The underlying result set store
    pub fn store(&self) -> &ResultSetStore {
        &self.store
    }

    /// Configured staleness threshold
    pub fn merge_timeout(&self) -> Duration {
        self.merge_timeout
    }

    /// Fresh stored results at `now`; see [`ResultLoader::results`]
    pub fn results(&self, now: DateTime<Utc>, max_age: Duration) -> Result<Vec<CoverageResult>> {
        ResultLoader::new(&self.store).results(now, max_age)
    }

    /// Fresh stored results at the current time with the configured timeout
    pub fn results_now(&self) -> Result<Vec<CoverageResult>> {
        self.results(Utc::now(), self.merge_timeout)
    }

    /// Merge every result fresh at `now` into one.
    ///
    /// The merged name joins the contributing names with `", "` in stored
    /// order. The merged result is stamped with `now`.
    pub fn merged_result(&self, now: DateTime<Utc>, max_age: Duration) -> Result<CoverageResult> {
        let results = self.results(now, max_age)?;
        let merged = merge_results(&results, now);
        debug!(
            command_name = %merged.command_name,
            results = results.len(),
            files = merged.coverage.len(),
            "Merged coverage results"
        );
        Ok(merged)
    }

    /// [`merged_result`](Self::merged_result) at the current time with the
    /// configured timeout
    pub fn merged_result_now(&self) -> Result<CoverageResult> {
        self.merged_result(Utc::now(), self.merge_timeout)
    }

    /// Save `result` in the shared result set, replacing any entry with the
    /// same command name.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the result was written
    /// - `Ok(false)` if the lock could not be obtained and nothing was written
    ///
    /// # Errors
    ///
    /// Corrupt cache content (the file is left as is) and I/O failures.
    pub fn store_result(&self, result: &CoverageResult) -> Result<bool> {
        let outcome = self
            .store
            .update(|set| set.upsert(result.command_name.clone(), result.to_entry()))
            .with_context(|| format!("Failed to store coverage for '{}'", result.command_name))?;

        if outcome.ran() {
            info!(
                command_name = %result.command_name,
                path = %self.store.resultset_path().display(),
                "Stored coverage result"
            );
        } else {
            warn!(
                command_name = %result.command_name,
                "Coverage result not stored; result set lock unavailable"
            );
        }
        Ok(outcome.ran())
    }

    /// Like [`store_result`](Self::store_result), but failing to obtain the
    /// lock is [`crate::core::MergeError::LockExhausted`].
    pub fn store_result_strict(&self, result: &CoverageResult) -> Result<()> {
        self.store
            .update(|set| {
                set.upsert(result.command_name.clone(), result.to_entry());
            })
            .with_context(|| format!("Failed to store coverage for '{}'", result.command_name))?
            .require()
    }
}

/// Fold `results` left to right into one result stamped with `now`.
///
/// Starts from empty coverage, so no results merge to an empty result with
/// an empty name. Duplicate names are kept.
pub fn merge_results(results: &[CoverageResult], now: DateTime<Utc>) -> CoverageResult {
    let coverage = results
        .iter()
        .fold(CoverageData::new(), |acc, result| acc.merge(&result.coverage));

    let command_name = results
        .iter()
        .map(|result| result.command_name.as_str())
        .collect::<Vec<_>>()
        .join(COMMAND_NAME_SEPARATOR);

    CoverageResult::with_created_at(command_name, coverage, now)
}
