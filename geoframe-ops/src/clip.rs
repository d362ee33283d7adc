//! Crop a frame to a mask extent.
//!
//! Clipping is a restricted overlay: intersection only, against a single
//! mask shape, and it never adds attribute columns. Rows whose geometry
//! falls entirely outside the mask are dropped; rows partially inside keep
//! the intersected part of their geometry.

use geo_types::{polygon, Geometry};
use geoframe_spatial::{BinaryPredicate, Crs, GeomArray, GeometryType, SpatialError};

use crate::error::Result;
use crate::frame::GeoFrame;
use crate::overlay::{extract_dimension, intersection_geometry};

/// The shape a frame is clipped against.
///
/// Frame and array masks are dissolved into a single shape first; their CRS
/// must equal the data's exactly. Bare geometry and rectangle masks carry
/// no CRS and skip the check.
#[derive(Debug)]
pub enum ClipMask<'a> {
    Geometry(Geometry<f64>),
    Frame(&'a GeoFrame),
    Array(&'a GeomArray),
    Rect(f64, f64, f64, f64),
}

/// Parameters for [`clip`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipParams {
    /// Keep only output parts matching each row's original dimension.
    pub keep_geom_type: bool,
    /// Guarantee original row order in the output. The default leaves the
    /// order unspecified.
    pub sort: bool,
}

/// Clip a frame to a mask.
///
/// With a rectangle mask, rows whose bounding box lies fully inside the
/// rectangle pass through without geometry math. The fast path can differ
/// from the general path on degenerate boundary output; that divergence is
/// accepted.
pub fn clip(data: &GeoFrame, mask: &ClipMask<'_>, params: &ClipParams) -> Result<GeoFrame> {
    check_mask_crs(data, mask)?;

    let (mask_geom, rect) = match mask {
        ClipMask::Geometry(g) => (g.clone(), None),
        ClipMask::Frame(f) => (f.geometry().unary_union(), None),
        ClipMask::Array(a) => (a.unary_union(), None),
        ClipMask::Rect(min_x, min_y, max_x, max_y) => {
            let rect = geoframe_spatial::BBox::new(*min_x, *min_y, *max_x, *max_y);
            let poly = polygon![
                (x: *min_x, y: *min_y),
                (x: *max_x, y: *min_y),
                (x: *max_x, y: *max_y),
                (x: *min_x, y: *max_y),
            ];
            (Geometry::Polygon(poly), Some(rect))
        }
    };

    let candidates = data
        .geometry()
        .sindex()
        .query(&mask_geom, Some(BinaryPredicate::Intersects), None)?;

    let mut kept_rows: Vec<usize> = Vec::with_capacity(candidates.len());
    let mut clipped: Vec<Option<Geometry<f64>>> = Vec::with_capacity(candidates.len());
    for row in candidates {
        let Some(geom) = data.geometry().get(row) else {
            continue;
        };
        // Rectangle fast path: fully contained rows need no geometry math.
        let piece = match (&rect, geoframe_spatial::BBox::from_geometry(geom)) {
            (Some(rect), Some(bbox)) if rect.contains_bbox(&bbox) => Some(geom.clone()),
            _ => intersection_geometry(geom, &mask_geom),
        };
        let piece = match (piece, params.keep_geom_type) {
            (None, _) => continue,
            (Some(p), false) => p,
            (Some(p), true) => {
                let Some(dim) = GeometryType::from_geometry(geom).dimension() else {
                    continue;
                };
                match extract_dimension(&p, dim) {
                    Some(extracted) => extracted,
                    None => continue,
                }
            }
        };
        kept_rows.push(row);
        clipped.push(Some(piece));
    }
    // Candidates arrive in ascending row order, so the output satisfies
    // sort=true without a separate pass.
    tracing::debug!(rows = kept_rows.len(), total = data.len(), "clip kept rows");
    let table = data.table().filter_by_indices(&kept_rows);
    let labels = kept_rows.iter().map(|&i| data.labels()[i]).collect();
    let geometry = GeomArray::new(clipped, data.crs().cloned());
    GeoFrame::with_labels(table, geometry, data.geometry_column(), labels)
}

fn check_mask_crs(data: &GeoFrame, mask: &ClipMask<'_>) -> Result<()> {
    let mask_crs = match mask {
        ClipMask::Frame(f) => f.crs(),
        ClipMask::Array(a) => a.crs(),
        ClipMask::Geometry(_) | ClipMask::Rect(..) => return Ok(()),
    };
    let describe = |crs: Option<&Crs>| crs.map_or_else(|| "unset".to_string(), Crs::to_string);
    match (data.crs(), mask_crs) {
        (Some(d), Some(m)) if d == m => Ok(()),
        (None, None) => Ok(()),
        (d, m) => Err(SpatialError::CrsMismatch {
            left: describe(d),
            right: describe(m),
        }
        .into()),
    }
}
