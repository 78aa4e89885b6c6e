//! Atomic file write operations using temp-and-rename strategy.
//!
//! This module provides safe, atomic file writing that prevents corruption
//! from interrupted writes.

use crate::core::{FileOperation, FileResultExt};
use crate::utils::fs::dirs::ensure_parent_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// This function ensures atomic writes by:
/// 1. Writing content to a temporary file (`.tmp` extension)
/// 2. Syncing the temporary file to disk
/// 3. Atomically renaming the temporary file to the target path
///
/// Readers never see a partially written file. The temporary name is fixed,
/// so concurrent writers to the same path must already be serialized; the
/// result set store only calls this while holding its lock marker.
///
/// # Examples
///
/// ```rust,no_run
/// use covmerge::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("coverage/resultset.yml"), b"--- {}\n")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Any I/O failure is reported as [`crate::core::MergeError::StoreIo`] with the
/// path involved, wrapped in a context message.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    ensure_parent_dir(path)?;

    // Write to temporary file first
    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path)
            .with_file_context(FileOperation::Write, &temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_file_context(FileOperation::Write, &temp_path)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all()
            .with_file_context(FileOperation::Write, &temp_path)
            .with_context(|| "Failed to sync file to disk")?;
    }

    // Atomic rename
    fs::rename(&temp_path, path)
        .with_file_context(FileOperation::Write, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}
