//! Unified error types for the Cordon workspace.
//!
//! Each higher-level crate wraps these common variants rather than defining
//! parallel hierarchies; the aggregate variant preserves every underlying
//! failure in encounter order.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CordonError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A command-line or configuration argument is invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An operation requires a running container but the target is stopped.
    #[error("container with id {id} is not running")]
    NotRunning {
        /// Identifier of the stopped container.
        id: String,
    },

    /// A system call or kernel interface failed.
    #[error("{op} failed: {message}")]
    Sys {
        /// Operation that failed.
        op: &'static str,
        /// Rendered OS error.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// Aggregate of several underlying failures, in encounter order.
    #[error("{}", messages.join("\n"))]
    Combined {
        /// Rendered messages of the aggregated errors.
        messages: Vec<String>,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CordonError>;

/// Collapses a list of errors into a single aggregate.
///
/// Returns `None` for an empty list. Otherwise the aggregate's message is
/// every underlying message, encounter order, joined by line breaks; no
/// deduplication is performed.
#[must_use]
pub fn combine_errors(errs: Vec<CordonError>) -> Option<CordonError> {
    if errs.is_empty() {
        return None;
    }
    Some(CordonError::Combined {
        messages: errs.iter().map(ToString::to_string).collect(),
    })
}
