use geoframe_spatial::SpatialError;
use geoframe_tabular::TableError;

pub type Result<T> = std::result::Result<T, OpsError>;

/// Errors from table-level spatial operations.
#[derive(thiserror::Error, Debug)]
pub enum OpsError {
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("invalid parameter: {0}")]
    Param(String),

    #[error("column name collision: {0:?}; disambiguate with suffixes")]
    ColumnCollision(Vec<String>),
}
