//! Error types for table operations.

use thiserror::Error;

/// Errors from attribute table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// Schema or structural error (duplicate column, row count mismatch, etc.)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Column not found by name.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;
