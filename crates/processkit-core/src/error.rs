//! Error handling for ProcessKit core
//!
//! Knowledge base loading is the only fallible operation in the core crate.
//! A malformed document fails process initialization, never an individual
//! planning request.

use std::path::PathBuf;
use thiserror::Error;

/// Knowledge base error type
///
/// Represents failures while reading, parsing or checking a persisted
/// knowledge base document.
#[derive(Error, Debug)]
pub enum KnowledgeBaseError {
    /// Document could not be read
    #[error("Failed to read knowledge base {path}: {source}")]
    Io {
        /// Path of the document.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON or does not match the expected layout
    #[error("Malformed knowledge base: {0}")]
    Json(#[from] serde_json::Error),

    /// Document parsed but violates a structural rule
    #[error("Invalid knowledge base: {reason}")]
    Invalid {
        /// The rule that was violated.
        reason: String,
    },
}

impl KnowledgeBaseError {
    /// Create an invalid-document error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Result type for knowledge base operations
pub type KnowledgeBaseResult<T> = std::result::Result<T, KnowledgeBaseError>;
