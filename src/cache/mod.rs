//! Cross-process result cache.
//!
//! Every test process that finishes writes its coverage into one shared file,
//! `<coverage_dir>/resultset.yml`, keyed by the name of the command that ran.
//! Processes run independently and may finish at the same moment, so all
//! access to the file is serialized through a lock marker next to it.
//!
//! # Layout
//!
//! ```text
//! coverage/
//! ├── resultset.yml        # ResultSet, replaced atomically on every write
//! ├── resultset.yml.lck    # lock marker, present only while held
//! └── resultset.yml.lck.break  # present only while reclaiming an abandoned marker
//! ```
//!
//! # Modules
//!
//! - [`lock`] - exclusive-create lock marker with a bounded retry budget
//! - [`resultset`] - the stored mapping and its YAML form
//! - [`store`] - locked whole-file reads and writes of the mapping

pub mod lock;
pub mod resultset;
pub mod store;

pub use lock::{LockGuard, LockManager, LockOutcome};
pub use resultset::{ResultSet, ResultSetEntry};
pub use store::ResultSetStore;
