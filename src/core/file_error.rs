//! Structured file system error handling for the result cache
//!
//! Captures what was being done to which file at the operation site, so an
//! I/O failure under the lock surfaces as [`MergeError::StoreIo`] instead of a
//! bare [`std::io::Error`].

use crate::core::error::MergeError;
use std::fmt;
use std::path::PathBuf;

/// Types of file operations performed on the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    /// Reading the result set
    Read,
    /// Writing the result set
    Write,
    /// Creating the coverage directory
    CreateDir,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::CreateDir => write!(f, "creating directory for"),
        }
    }
}

/// Extension trait for Result types to add file operation context
pub trait FileResultExt<T> {
    /// Convert an I/O error into [`MergeError::StoreIo`] for `file_path`
    fn with_file_context(
        self,
        operation: FileOperation,
        file_path: impl Into<PathBuf>,
    ) -> Result<T, MergeError>;
}

impl<T> FileResultExt<T> for Result<T, std::io::Error> {
    fn with_file_context(
        self,
        operation: FileOperation,
        file_path: impl Into<PathBuf>,
    ) -> Result<T, MergeError> {
        self.map_err(|source| MergeError::StoreIo {
            operation,
            path: file_path.into(),
            source,
        })
    }
}
