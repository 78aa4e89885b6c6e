//! Stress tests for the shared result cache
//!
//! Many threads hammer one coverage directory at once, standing in for test
//! processes that finish together. These tests are slower than the
//! integration suite and are not meant for every CI run.
//!
//! # Running Stress Tests
//!
//! ```bash
//! cargo test --test stress -- --nocapture
//! ```
//!
//! Timings are printed for manual review rather than asserted.

mod contention;
