//! Text file reads that tolerate a missing file.

use crate::core::{FileOperation, FileResultExt};
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Reads a text file, returning `None` if it does not exist.
///
/// Existence is decided by the read itself rather than a prior `exists()`
/// check, so a file removed between check and read is still reported as
/// missing instead of failing.
///
/// # Errors
///
/// Any error other than `NotFound` is reported as
/// [`crate::core::MergeError::StoreIo`].
pub fn read_text_file_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e)
            .with_file_context(FileOperation::Read, path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
    }
}
