//! Table-level spatial operations: joins, overlay and clipping.
//!
//! [`GeoFrame`] pairs an attribute [`geoframe_tabular::Table`] with a
//! [`geoframe_spatial::GeomArray`] of equal length. The engines in this
//! crate query the geometry column's spatial index for candidate row pairs,
//! refine them with exact predicates or set operations, and assemble the
//! result through the tabular gather and stack primitives.

pub mod clip;
pub mod error;
pub mod frame;
pub mod overlay;
pub mod sjoin;

pub use clip::{clip, ClipMask, ClipParams};
pub use error::{OpsError, Result};
pub use frame::GeoFrame;
pub use overlay::{make_valid, overlay, OverlayHow, OverlayParams};
pub use sjoin::{sjoin, sjoin_nearest, JoinHow, SjoinNearestParams, SjoinParams};
