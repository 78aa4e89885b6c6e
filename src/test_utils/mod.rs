//! Test utilities for covmerge
//!
//! Helpers shared by unit tests and the integration suites:
//! - one-time `tracing` initialization
//! - coverage fixtures with controllable timestamps
//! - a [`TestEnvironment`] owning a temporary coverage directory
//!
//! # Example
//!
//! ```rust,no_run
//! use covmerge::test_utils::{TestEnvironment, fixtures::result_aged};
//! use chrono::Utc;
//!
//! let env = TestEnvironment::new().unwrap();
//! let merger = env.merger();
//! merger.store_result(&result_aged("unit", 30, Utc::now())).unwrap();
//! assert!(env.resultset_exists());
//! ```

pub mod environment;
pub mod fixtures;

pub use environment::TestEnvironment;
pub use fixtures::CoverageFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Runs at most once per process. Uses `level` if given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=covmerge=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .try_init();
    });
}
