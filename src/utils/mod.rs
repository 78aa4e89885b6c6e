//! File system helpers shared by the cache modules
//!
//! - [`fs`] - Atomic writes, directory creation, and tolerant reads

pub mod fs;

pub use fs::{atomic_write, ensure_dir, ensure_parent_dir, read_text_file_if_exists};
