//! Rebuilding coverage results from the stored set, filtered by age.

use crate::cache::ResultSetStore;
use crate::coverage::CoverageResult;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tracing::debug;

/// Loads stored results that are still fresh enough to merge.
#[derive(Debug, Clone, Copy)]
pub struct ResultLoader<'a> {
    store: &'a ResultSetStore,
}

impl<'a> ResultLoader<'a> {
    /// Loader reading from `store`
    pub fn new(store: &'a ResultSetStore) -> Self {
        Self { store }
    }

    /// Stored results whose age at `now` is below `max_age`, in stored order.
    ///
    /// Older entries are skipped but stay in the cache file. Entries stamped
    /// after `now` count as fresh.
    ///
    /// # Errors
    ///
    /// Corrupt cache content and I/O failures while reading.
    pub fn results(&self, now: DateTime<Utc>, max_age: Duration) -> Result<Vec<CoverageResult>> {
        let set = self.store.resultset().context("Failed to load stored coverage results")?;

        let mut results = Vec::with_capacity(set.len());
        for (command_name, entry) in set {
            if is_fresh(entry.created_at, now, max_age) {
                results.push(CoverageResult::from_entry(command_name, entry));
            } else {
                debug!(
                    command_name = %command_name,
                    created_at = %entry.created_at,
                    "Skipping stale coverage result"
                );
            }
        }
        Ok(results)
    }
}

/// Whether a result created at `created_at` is younger than `max_age` at `now`.
pub fn is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(created_at) < max_age
}
