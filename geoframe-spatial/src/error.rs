//! Error types for the spatial core.

use thiserror::Error;

/// Spatial core errors.
#[derive(Error, Debug)]
pub enum SpatialError {
    /// Construction error (bad shape or length of input).
    #[error("Construction error: {0}")]
    Construction(String),

    /// WKT parsing error.
    #[error("WKT parse error at element {index}: {message}")]
    WktParse { index: usize, message: String },

    /// WKB decoding error.
    #[error("WKB decode error at element {index}: {message}")]
    WkbParse { index: usize, message: String },

    /// Invalid geometry (e.g., self-intersecting polygon).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Configuration error (bad argument combination).
    #[error("Configuration error: {0}")]
    Config(String),

    /// CRS must be set before the requested operation.
    #[error("CRS not set: {0}")]
    MissingCrs(String),

    /// CRS definitions disagree where exact agreement is required.
    #[error("CRS mismatch: left is {left}, right is {right}")]
    CrsMismatch { left: String, right: String },

    /// Unknown or unparsable CRS definition.
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),

    /// Coordinate transformation error.
    #[error("Projection error: {0}")]
    Projection(String),
}

/// Result type for spatial operations.
pub type Result<T> = std::result::Result<T, SpatialError>;
