//! Coverage fixtures.

use crate::coverage::{CoverageData, CoverageResult, LineHits};
use chrono::{DateTime, TimeDelta, Utc};

/// Builder for [`CoverageData`] payloads used in tests
#[derive(Clone, Debug, Default)]
pub struct CoverageFixture {
    data: CoverageData,
}

impl CoverageFixture {
    /// Empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// A small two-file payload with relevant and irrelevant lines
    pub fn basic() -> Self {
        Self::new()
            .file("lib/parser.rs", vec![Some(1), None, Some(0), Some(3)])
            .file("lib/lexer.rs", vec![None, Some(2)])
    }

    /// Add a file with explicit line hits
    pub fn file(mut self, path: &str, lines: LineHits) -> Self {
        self.data.insert_file(path, lines);
        self
    }

    /// Add a file where every one of `lines` lines was hit `hits` times
    pub fn uniform(self, path: &str, lines: usize, hits: u64) -> Self {
        self.file(path, vec![Some(hits); lines])
    }

    /// The finished payload
    pub fn build(self) -> CoverageData {
        self.data
    }

    /// Wrap the payload in a result named `command_name` created at `created_at`
    pub fn result(self, command_name: &str, created_at: DateTime<Utc>) -> CoverageResult {
        CoverageResult::with_created_at(command_name, self.data, created_at)
    }
}

/// [`CoverageFixture::basic`] as a result finished `age_secs` before `now`
pub fn result_aged(command_name: &str, age_secs: i64, now: DateTime<Utc>) -> CoverageResult {
    CoverageFixture::basic().result(command_name, now - TimeDelta::seconds(age_secs))
}
