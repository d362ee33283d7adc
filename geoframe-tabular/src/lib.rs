//! Columnar attribute tables for geoframe.
//!
//! This crate provides the tabular half of a geospatial frame: typed
//! attribute columns with schema information, plus the row-selection and
//! concatenation primitives the spatial join/overlay engines assemble their
//! results with.
//!
//! # Design
//!
//! - **Columnar storage**: data lives in a typed `Vec` per column, not per-row
//! - **Strongly typed**: all column access goes through the `Column` enum,
//!   no `dyn Any`
//! - **Name canonical**: column names are the canonical identifier; duplicate
//!   names are rejected at schema construction
//! - **Join-friendly**: `take_padded` accepts `-1` sentinels and fills null
//!   rows, which is exactly what an outer spatial join needs

pub mod error;
pub mod table;

pub use error::{Result, TableError};
pub use table::{Column, Field, FieldType, Table, TableSchema};
