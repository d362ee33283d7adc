//! Planar geometry columns, coordinate reference systems, and spatial
//! indexing.
//!
//! The core type is [`GeomArray`], a nullable column of geometries that
//! carries an optional [`Crs`] and lazily builds a [`SpatialIndex`] over its
//! contents. Queries against the index run a bounding-box prefilter through
//! an R-tree and refine candidates with exact predicate evaluation from the
//! [`predicate`] registry.

pub mod array;
pub mod crs;
pub mod distance;
pub mod error;
pub mod geometry;
pub mod predicate;
pub mod sindex;
pub mod wkb;

pub use array::{GeomArray, OnInvalid, Values};
pub use crs::Crs;
pub use distance::geometry_distance;
pub use error::{Result, SpatialError};
pub use geometry::{parse_wkt, write_wkt, BBox, GeometryType};
pub use predicate::{evaluate, BinaryPredicate, VALID_PREDICATES};
pub use sindex::{Distances, MatchPairs, NearestParams, SpatialIndex};
pub use wkb::{parse_wkb, write_wkb};
