//! Error types for filter expression parsing.

use thiserror::Error;

/// Errors that can occur while parsing a filter expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Parse error at a specific position in the input.
    #[error("parse error at position {position}: {message}")]
    ParseError {
        /// Byte offset in the input where the error occurred.
        position: usize,
        /// Description of the error.
        message: String,
    },

    /// Filter expression is incomplete.
    #[error("filter expression is incomplete: {0}")]
    Incomplete(String),

    /// Empty input provided.
    #[error("empty filter expression")]
    EmptyExpression,
}

/// Result type for filter operations.
pub type FilterResult<T> = std::result::Result<T, FilterError>;
