//! Error types for the query enhancer crate.

use std::path::PathBuf;

/// Result type for enhancer operations.
pub type EnhancerResult<T> = Result<T, EnhancerError>;

/// Errors that can occur inside the enhancer.
///
/// None of these reach the caller of [`crate::QueryEnhancer::enhance`]:
/// they are logged and the call degrades to a less expanded result.
#[derive(Debug, thiserror::Error)]
pub enum EnhancerError {
    /// Ontology resolution or expansion error.
    #[error("Ontology error: {0}")]
    Ontology(#[from] cxg_ontology::OntologyError),

    /// Filter expression error.
    #[error("Filter error: {0}")]
    Filter(#[from] cxg_filter::FilterError),

    /// Census backend error.
    #[error("Census error: {0}")]
    Census(String),

    /// I/O error during persistence operations.
    #[error("I/O error at {path}: {source}")]
    IoError {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid file format during load.
    #[error("Invalid file format: {message}")]
    InvalidFormat {
        /// What was wrong.
        message: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Payload hash mismatch during validation.
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Hash recorded in the file.
        expected: String,
        /// Hash of the payload actually read.
        actual: String,
    },

    /// Worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl EnhancerError {
    /// Creates an I/O error with path context.
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true if the error means a durable cache file is unusable.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat { .. } | Self::DeserializationError(_) | Self::HashMismatch { .. }
        )
    }
}
