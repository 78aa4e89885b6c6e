//! Coverage results and the line-hit merge primitive.
//!
//! A [`CoverageResult`] is one test run's recorded line hits plus the name of
//! the command that produced it and the time it finished. Its payload,
//! [`CoverageData`], maps a source file path to a per-line hit array:
//!
//! - index `i` describes line `i + 1`
//! - `None` marks a line that is not relevant for coverage (blank, comment)
//! - `Some(n)` is the number of times the line executed
//!
//! [`CoverageData::merge`] is the primitive the merger folds with. It is pure,
//! associative and commutative: files are unioned, and on shared files hits
//! are summed line by line, with a line staying `None` only if it is `None` on
//! both sides.

use crate::cache::ResultSetEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hit counts for the lines of one source file.
pub type LineHits = Vec<Option<u64>>;

/// Per-file line hit data of one coverage run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageData {
    files: BTreeMap<String, LineHits>,
}

impl CoverageData {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the line hits of a file, replacing any previous entry
    pub fn insert_file(&mut self, path: impl Into<String>, lines: LineHits) {
        self.files.insert(path.into(), lines);
    }

    /// Builder form of [`insert_file`](Self::insert_file)
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, lines: LineHits) -> Self {
        self.insert_file(path, lines);
        self
    }

    /// Line hits for a file, if it was recorded
    pub fn file(&self, path: &str) -> Option<&LineHits> {
        self.files.get(path)
    }

    /// Iterate over recorded files in path order
    pub fn files(&self) -> impl Iterator<Item = (&str, &LineHits)> {
        self.files.iter().map(|(path, lines)| (path.as_str(), lines))
    }

    /// Number of recorded files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file was recorded
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Combine two payloads into one covering the union of their files.
    #[must_use]
    pub fn merge(&self, other: &CoverageData) -> CoverageData {
        let mut files = self.files.clone();
        for (path, theirs) in &other.files {
            let merged = match files.get(path) {
                Some(ours) => merge_lines(ours, theirs),
                None => theirs.clone(),
            };
            files.insert(path.clone(), merged);
        }
        CoverageData { files }
    }
}

fn merge_lines(a: &[Option<u64>], b: &[Option<u64>]) -> LineHits {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let left = a.get(i).copied().flatten();
            let right = b.get(i).copied().flatten();
            match (left, right) {
                (None, None) => None,
                (l, r) => Some(l.unwrap_or(0).saturating_add(r.unwrap_or(0))),
            }
        })
        .collect()
}

/// One test run's coverage, named by the command that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageResult {
    /// Identifier of the producing run; the key in the result set
    pub command_name: String,
    /// Line hits per file
    pub coverage: CoverageData,
    /// When the producing run finished
    pub created_at: DateTime<Utc>,
}

impl CoverageResult {
    /// Create a result stamped with the current time
    pub fn new(command_name: impl Into<String>, coverage: CoverageData) -> Self {
        Self::with_created_at(command_name, coverage, Utc::now())
    }

    /// Create a result with an explicit completion time
    pub fn with_created_at(
        command_name: impl Into<String>,
        coverage: CoverageData,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            coverage,
            created_at,
        }
    }

    /// Rebuild a result from its stored entry
    pub fn from_entry(command_name: impl Into<String>, entry: ResultSetEntry) -> Self {
        Self {
            command_name: command_name.into(),
            coverage: entry.coverage,
            created_at: entry.created_at,
        }
    }

    /// The stored form of this result, without its name
    pub fn to_entry(&self) -> ResultSetEntry {
        ResultSetEntry {
            coverage: self.coverage.clone(),
            created_at: self.created_at,
        }
    }

    /// Merge the payload of `other` into a copy of this result.
    ///
    /// Name and timestamp are kept from `self`; callers producing an aggregate
    /// assign both afterwards.
    #[must_use]
    pub fn merge(&self, other: &CoverageResult) -> CoverageResult {
        CoverageResult {
            command_name: self.command_name.clone(),
            coverage: self.coverage.merge(&other.coverage),
            created_at: self.created_at,
        }
    }
}
