//! File system operations used by the result cache.
//!
//! Every write of the result set goes through [`atomic_write`], so a process
//! crashing mid-write leaves either the previous file or the new one behind,
//! never a truncated document.

pub mod atomic;
pub mod dirs;
pub mod formats;

// Directory operations
pub use dirs::{ensure_dir, ensure_parent_dir};

// Atomic write operations
pub use atomic::atomic_write;

// Reads
pub use formats::read_text_file_if_exists;
