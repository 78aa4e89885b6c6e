//! The persisted result set and its YAML form.
//!
//! The whole cache is one YAML mapping from command name to stored entry:
//!
//! ```yaml
//! unit:
//!   coverage:
//!     src/lib.rs: [1, null, 0]
//!   created_at: 2026-10-18T12:00:00Z
//! ```
//!
//! Entries keep the order they were first inserted in, which is also the order
//! the merger names them in.

use crate::core::MergeError;
use crate::coverage::CoverageData;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One stored coverage run: its payload and completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSetEntry {
    /// Line hits per file
    pub coverage: CoverageData,
    /// When the producing run finished; never changed by merging
    pub created_at: DateTime<Utc>,
}

/// Mapping of command name to stored entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: IndexMap<String, ResultSetEntry>,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry stored under `command_name`
    pub fn get(&self, command_name: &str) -> Option<&ResultSetEntry> {
        self.entries.get(command_name)
    }

    /// Whether an entry is stored under `command_name`
    pub fn contains(&self, command_name: &str) -> bool {
        self.entries.contains_key(command_name)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultSetEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Command names in insertion order
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Store `entry` under `command_name`, replacing any previous entry.
    ///
    /// A replaced entry keeps its position. Returns the replaced entry.
    pub fn upsert(
        &mut self,
        command_name: impl Into<String>,
        entry: ResultSetEntry,
    ) -> Option<ResultSetEntry> {
        self.entries.insert(command_name.into(), entry)
    }

    /// Parse the cache file content read from `path`.
    ///
    /// Empty or whitespace-only content and a YAML `null` document are an
    /// empty set. Everything else that does not deserialize into a result set
    /// is [`MergeError::CorruptCache`].
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, MergeError> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let parsed: Option<Self> =
            serde_yaml::from_str(content).map_err(|e| MergeError::CorruptCache {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(parsed.unwrap_or_default())
    }

    /// Serialize for writing to `path`
    pub fn to_yaml(&self, path: &Path) -> Result<String, MergeError> {
        serde_yaml::to_string(self).map_err(|e| MergeError::SerializeFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = (&'a String, &'a ResultSetEntry);
    type IntoIter = indexmap::map::Iter<'a, String, ResultSetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = (String, ResultSetEntry);
    type IntoIter = indexmap::map::IntoIter<String, ResultSetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
