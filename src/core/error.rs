//! Error handling for covmerge
//!
//! This module provides the typed errors raised by the result cache and the
//! user-facing wrapper used when reporting them. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** so callers can tell failure modes apart
//! 2. **User-friendly messages** with an actionable suggestion where one exists
//!
//! # Error Channels
//!
//! Lock acquisition and the work done under the lock are reported separately:
//!
//! - Running out of lock attempts is *not* an error by default. It is reported
//!   as [`crate::cache::LockOutcome::Exhausted`] and only becomes
//!   [`MergeError::LockExhausted`] when a caller opts in through
//!   [`crate::cache::LockOutcome::require`].
//! - Failures inside the critical section ([`MergeError::CorruptCache`],
//!   [`MergeError::StoreIo`]) always propagate.
//!
//! Public operations return [`anyhow::Result`]; the typed error is recovered
//! with [`anyhow::Error::downcast_ref`]:
//!
//! ```rust,no_run
//! use covmerge::core::MergeError;
//!
//! fn report(err: &anyhow::Error) {
//!     match err.downcast_ref::<MergeError>() {
//!         Some(MergeError::CorruptCache { path, .. }) => {
//!             eprintln!("result set at {} is unreadable", path.display());
//!         }
//!         Some(other) => eprintln!("{other}"),
//!         None => eprintln!("{err:#}"),
//!     }
//! }
//! ```

use crate::core::file_error::FileOperation;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for covmerge operations
#[derive(Error, Debug)]
pub enum MergeError {
    /// Every lock attempt failed and the critical section never ran.
    ///
    /// Only produced for callers that asked for strict lock semantics.
    #[error("Could not acquire lock {path} after {attempts} attempts")]
    LockExhausted {
        /// Path of the lock marker
        path: PathBuf,
        /// Number of attempts made
        attempts: u32,
    },

    /// The persisted result set exists but cannot be deserialized.
    ///
    /// An empty or `null` document is not corrupt; it reads as an empty set.
    #[error("Corrupt result set cache at {path}: {reason}")]
    CorruptCache {
        /// Path of the result set file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// An I/O error while reading or writing the cache under a held lock.
    #[error("Failed {operation} result set cache at {path}")]
    StoreIo {
        /// What was being done when the error occurred
        operation: FileOperation,
        /// File being accessed
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The result set could not be serialized for writing.
    #[error("Failed to serialize result set for {path}: {reason}")]
    SerializeFailed {
        /// Path of the result set file
        path: PathBuf,
        /// Serializer message
        reason: String,
    },

    /// Configuration file failed to parse.
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid {
        /// Path of the configuration file
        path: PathBuf,
        /// Parser message
        reason: String,
    },
}

impl MergeError {
    /// Get an actionable hint for the error, if there is one
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::LockExhausted { path, .. } => Some(format!(
                "Another process may still be merging coverage. If none is running, remove {}",
                path.display()
            )),
            Self::CorruptCache { path, .. } => Some(format!(
                "Delete {} and re-run the test suites to rebuild it",
                path.display()
            )),
            Self::StoreIo { .. } => {
                Some("Check that the coverage directory exists and is writable".to_string())
            }
            Self::ConfigInvalid { .. } => {
                Some("Check the configuration file for TOML syntax errors".to_string())
            }
            Self::SerializeFailed { .. } => None,
        }
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockExhausted { .. })
    }
}

/// Error wrapper carrying a user-facing suggestion and details
///
/// Built with [`user_friendly_error`] from any [`anyhow::Error`] returned by this
/// crate, or by hand with the builder methods.
#[derive(Debug)]
pub struct ErrorContext {
    /// Top-level error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with only a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`]
///
/// Known [`MergeError`] variants anywhere in the chain contribute their
/// suggestion; the rest of the chain becomes the details.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut context = ErrorContext::new(error.to_string());

    if let Some(merge_error) = error.chain().find_map(|e| e.downcast_ref::<MergeError>()) {
        if let Some(suggestion) = merge_error.suggestion() {
            context = context.with_suggestion(suggestion);
        }
    }

    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !causes.is_empty() {
        context = context.with_details(causes.join(": "));
    }

    context
}
