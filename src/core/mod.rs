//! Core error types shared by every covmerge module.

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, MergeError, user_friendly_error};
pub use file_error::{FileOperation, FileResultExt};
