//! Set-operation overlay between two geometry-typed frames.
//!
//! The pairwise kernel works on dimension-decomposed geometries: areal
//! parts go through polygon boolean ops, linework is clipped against
//! polygons and intersected segment-by-segment, points are kept by
//! containment. Candidate pairs come from the right frame's spatial index,
//! so non-overlapping rows never reach the kernel.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{BooleanOps, HasDimensions, Intersects, Validation};
use geo_types::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use geoframe_spatial::{BinaryPredicate, GeomArray, SpatialError};

use crate::error::{OpsError, Result};
use crate::frame::GeoFrame;

/// The set operation an overlay computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayHow {
    Intersection,
    Union,
    Identity,
    SymmetricDifference,
    Difference,
}

/// Parameters for [`overlay`].
#[derive(Debug, Clone)]
pub struct OverlayParams {
    pub how: OverlayHow,
    /// Keep only output parts matching the left frame's dominant dimension.
    /// `None` behaves as `true` but warns when rows are dropped or parts
    /// extracted, so callers are not silently surprised.
    pub keep_geom_type: Option<bool>,
    /// Repair invalid areal inputs before any overlay math. When false, an
    /// invalid input fails the whole call up front.
    pub make_valid: bool,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            how: OverlayHow::Intersection,
            keep_geom_type: None,
            make_valid: true,
        }
    }
}

/// Repair an invalid geometry.
///
/// Areal geometries are rebuilt through a union with the empty multipolygon,
/// which resolves self-intersections into valid rings. Other kinds are
/// returned unchanged.
pub fn make_valid(geom: &Geometry<f64>) -> Geometry<f64> {
    match geom {
        Geometry::Polygon(p) => {
            normalize_multipolygon(MultiPolygon(vec![p.clone()]).union(&MultiPolygon(vec![])))
        }
        Geometry::MultiPolygon(mp) => {
            normalize_multipolygon(mp.union(&MultiPolygon(vec![])))
        }
        other => other.clone(),
    }
}

fn normalize_multipolygon(mp: MultiPolygon<f64>) -> Geometry<f64> {
    if mp.0.len() == 1 {
        let mut polys = mp.0;
        Geometry::Polygon(polys.swap_remove(0))
    } else {
        Geometry::MultiPolygon(mp)
    }
}

/// Overlay two frames with a planar set operation.
///
/// Output rows carry the attribute columns of every contributing side;
/// the non-contributing side of a difference-style row is null-filled.
/// Colliding attribute names are suffixed `_1` (left) and `_2` (right).
/// Rows whose resulting geometry is empty are dropped, and the output is
/// labeled positionally.
pub fn overlay(left: &GeoFrame, right: &GeoFrame, params: &OverlayParams) -> Result<GeoFrame> {
    check_suffixed_names(left, right)?;
    if let (Some(l), Some(r)) = (left.crs(), right.crs()) {
        if l != r {
            tracing::warn!(left = %l, right = %r, "overlaying frames with different CRS");
        }
    }

    let left_clean = cleaned_slots(left.geometry(), params.make_valid)?;
    let right_clean = cleaned_slots(right.geometry(), params.make_valid)?;
    let left_parts: Vec<Option<Parts>> = left_clean.iter().map(decompose_slot).collect();
    let right_parts: Vec<Option<Parts>> = right_clean.iter().map(decompose_slot).collect();

    // Candidate pairs via bbox prefilter plus exact intersects.
    let index = geoframe_spatial::SpatialIndex::new(&right_clean);
    let pairs = index.query_many(&left_clean, Some(BinaryPredicate::Intersects), None, true)?;
    let mut left_matches: Vec<Vec<usize>> = vec![Vec::new(); left.len()];
    let mut right_matches: Vec<Vec<usize>> = vec![Vec::new(); right.len()];
    for (&l, &r) in pairs.input.iter().zip(&pairs.tree) {
        left_matches[l].push(r);
        right_matches[r].push(l);
    }

    let mut rows = OverlayRows::default();
    if matches!(
        params.how,
        OverlayHow::Intersection | OverlayHow::Union | OverlayHow::Identity
    ) {
        for (&l, &r) in pairs.input.iter().zip(&pairs.tree) {
            let (Some(a), Some(b)) = (&left_parts[l], &right_parts[r]) else {
                continue;
            };
            if let Some(geom) = assemble_parts(intersect_parts(a, b)) {
                rows.push(l as i64, r as i64, geom);
            }
        }
    }
    if matches!(
        params.how,
        OverlayHow::Difference
            | OverlayHow::Union
            | OverlayHow::Identity
            | OverlayHow::SymmetricDifference
    ) {
        for (l, parts) in left_parts.iter().enumerate() {
            let Some(a) = parts else { continue };
            let others: Vec<&Parts> = left_matches[l]
                .iter()
                .filter_map(|&r| right_parts[r].as_ref())
                .collect();
            if let Some(geom) = assemble_parts(subtract_parts(a, &others)) {
                rows.push(l as i64, -1, geom);
            }
        }
    }
    if matches!(
        params.how,
        OverlayHow::Union | OverlayHow::SymmetricDifference
    ) {
        for (r, parts) in right_parts.iter().enumerate() {
            let Some(b) = parts else { continue };
            let others: Vec<&Parts> = right_matches[r]
                .iter()
                .filter_map(|&l| left_parts[l].as_ref())
                .collect();
            if let Some(geom) = assemble_parts(subtract_parts(b, &others)) {
                rows.push(-1, r as i64, geom);
            }
        }
    }

    let rows = retain_geom_type(rows, &left_clean, params.keep_geom_type);
    tracing::debug!(how = ?params.how, rows = rows.geoms.len(), "overlay computed");
    assemble_frame(left, right, rows)
}

fn cleaned_slots(array: &GeomArray, repair: bool) -> Result<Vec<Option<Geometry<f64>>>> {
    let mut out = Vec::with_capacity(array.len());
    for (i, slot) in array.slots().iter().enumerate() {
        let cleaned = match slot {
            None => None,
            Some(g) if g.is_valid() => Some(g.clone()),
            Some(g) if repair => Some(make_valid(g)),
            Some(_) => {
                return Err(OpsError::Spatial(SpatialError::InvalidGeometry(format!(
                    "invalid geometry at position {i}; pass make_valid to repair"
                ))));
            }
        };
        out.push(cleaned);
    }
    Ok(out)
}

/// A geometry decomposed by dimension.
#[derive(Debug, Clone, Default)]
struct Parts {
    polys: Vec<Polygon<f64>>,
    lines: Vec<LineString<f64>>,
    points: Vec<Point<f64>>,
}

impl Parts {
    fn as_multipolygon(&self) -> MultiPolygon<f64> {
        MultiPolygon(self.polys.clone())
    }

    fn as_multilinestring(&self) -> MultiLineString<f64> {
        MultiLineString(self.lines.clone())
    }

    fn whole(&self) -> Geometry<f64> {
        // Containment tests need the original shape back in one value.
        assemble_parts(self.clone()).unwrap_or_else(|| {
            Geometry::GeometryCollection(GeometryCollection::default())
        })
    }
}

fn decompose_slot(slot: &Option<Geometry<f64>>) -> Option<Parts> {
    let geom = slot.as_ref()?;
    if geom.is_empty() {
        return None;
    }
    let mut parts = Parts::default();
    decompose_into(geom, &mut parts);
    Some(parts)
}

fn decompose_into(geom: &Geometry<f64>, parts: &mut Parts) {
    match geom {
        Geometry::Point(p) => parts.points.push(*p),
        Geometry::MultiPoint(mp) => parts.points.extend(mp.0.iter().copied()),
        Geometry::Line(l) => parts.lines.push(LineString::from(vec![l.start, l.end])),
        Geometry::LineString(ls) => {
            if ls.0.len() >= 2 {
                parts.lines.push(ls.clone());
            }
        }
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                if ls.0.len() >= 2 {
                    parts.lines.push(ls.clone());
                }
            }
        }
        Geometry::Polygon(p) => {
            if !p.is_empty() {
                parts.polys.push(p.clone());
            }
        }
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                if !p.is_empty() {
                    parts.polys.push(p.clone());
                }
            }
        }
        Geometry::Rect(r) => parts.polys.push(r.to_polygon()),
        Geometry::Triangle(t) => parts.polys.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                decompose_into(g, parts);
            }
        }
    }
}

/// Pairwise intersection across all dimension combinations.
fn intersect_parts(a: &Parts, b: &Parts) -> Parts {
    let mut out = Parts::default();

    if !a.polys.is_empty() && !b.polys.is_empty() {
        out.polys
            .extend(a.as_multipolygon().intersection(&b.as_multipolygon()).0);
    }
    if !a.lines.is_empty() && !b.polys.is_empty() {
        out.lines
            .extend(b.as_multipolygon().clip(&a.as_multilinestring(), false).0);
    }
    if !b.lines.is_empty() && !a.polys.is_empty() {
        out.lines
            .extend(a.as_multipolygon().clip(&b.as_multilinestring(), false).0);
    }
    // Line-by-line intersection yields crossing points plus collinear
    // overlap segments.
    for la in &a.lines {
        for lb in &b.lines {
            for seg_a in la.lines() {
                for seg_b in lb.lines() {
                    match line_intersection(seg_a, seg_b) {
                        Some(LineIntersection::SinglePoint { intersection, .. }) => {
                            out.points.push(Point(intersection));
                        }
                        Some(LineIntersection::Collinear { intersection }) => {
                            out.lines
                                .push(LineString::from(vec![intersection.start, intersection.end]));
                        }
                        None => {}
                    }
                }
            }
        }
    }
    let b_whole = b.whole();
    for p in &a.points {
        if Geometry::Point(*p).intersects(&b_whole) {
            out.points.push(*p);
        }
    }
    let a_whole = a.whole();
    for p in &b.points {
        if Geometry::Point(*p).intersects(&a_whole) {
            out.points.push(*p);
        }
    }
    dedup_points(&mut out.points);
    out
}

/// Subtract every geometry in `others` from `a`.
///
/// Lower-dimension residue is measure-zero and ignored: subtracting a line
/// from a line or a point from anything leaves the operand unchanged.
fn subtract_parts(a: &Parts, others: &[&Parts]) -> Parts {
    let mut out = Parts::default();

    let other_polys: Vec<Polygon<f64>> = others
        .iter()
        .flat_map(|p| p.polys.iter().cloned())
        .collect();
    if other_polys.is_empty() {
        out.polys = a.polys.clone();
        out.lines = a.lines.clone();
    } else {
        let eraser = MultiPolygon(other_polys);
        if !a.polys.is_empty() {
            out.polys.extend(a.as_multipolygon().difference(&eraser).0);
        }
        if !a.lines.is_empty() {
            out.lines.extend(eraser.clip(&a.as_multilinestring(), true).0);
        }
    }

    let other_wholes: Vec<Geometry<f64>> = others.iter().map(|p| p.whole()).collect();
    for p in &a.points {
        let covered = other_wholes
            .iter()
            .any(|w| Geometry::Point(*p).intersects(w));
        if !covered {
            out.points.push(*p);
        }
    }
    out
}

fn dedup_points(points: &mut Vec<Point<f64>>) {
    points.sort_unstable_by(|a, b| {
        a.x()
            .total_cmp(&b.x())
            .then_with(|| a.y().total_cmp(&b.y()))
    });
    points.dedup();
}

/// Collapse decomposed parts back into one geometry value, or `None` when
/// nothing with extent remains.
fn assemble_parts(parts: Parts) -> Option<Geometry<f64>> {
    let Parts {
        polys,
        mut lines,
        points,
    } = parts;
    let polys: Vec<Polygon<f64>> = polys.into_iter().filter(|p| !p.is_empty()).collect();
    lines.retain(|ls| ls.0.len() >= 2);

    let mut categories: Vec<Geometry<f64>> = Vec::new();
    if !polys.is_empty() {
        categories.push(normalize_multipolygon(MultiPolygon(polys)));
    }
    if !lines.is_empty() {
        categories.push(if lines.len() == 1 {
            Geometry::LineString(lines.swap_remove(0))
        } else {
            Geometry::MultiLineString(MultiLineString(lines))
        });
    }
    if !points.is_empty() {
        categories.push(if points.len() == 1 {
            Geometry::Point(points[0])
        } else {
            Geometry::MultiPoint(MultiPoint(points))
        });
    }
    match categories.len() {
        0 => None,
        1 => categories.pop(),
        _ => Some(Geometry::GeometryCollection(GeometryCollection(categories))),
    }
}

/// Exact intersection of two geometry values through the dimension kernel.
pub(crate) fn intersection_geometry(
    a: &Geometry<f64>,
    b: &Geometry<f64>,
) -> Option<Geometry<f64>> {
    let a_parts = decompose_slot(&Some(a.clone()))?;
    let b_parts = decompose_slot(&Some(b.clone()))?;
    assemble_parts(intersect_parts(&a_parts, &b_parts))
}

/// Parts of `geom` with the given dimension, as one geometry value.
pub(crate) fn extract_dimension(geom: &Geometry<f64>, dim: u8) -> Option<Geometry<f64>> {
    let mut parts = Parts::default();
    decompose_into(geom, &mut parts);
    assemble_parts(Parts {
        polys: if dim == 2 { parts.polys } else { Vec::new() },
        lines: if dim == 1 { parts.lines } else { Vec::new() },
        points: if dim == 0 { parts.points } else { Vec::new() },
    })
}

#[derive(Debug, Default)]
struct OverlayRows {
    left_take: Vec<i64>,
    right_take: Vec<i64>,
    geoms: Vec<Option<Geometry<f64>>>,
}

impl OverlayRows {
    fn push(&mut self, l: i64, r: i64, geom: Geometry<f64>) {
        self.left_take.push(l);
        self.right_take.push(r);
        self.geoms.push(Some(geom));
    }
}

/// Keep only parts matching the left frame's dominant dimension, dropping
/// rows that lose all geometry.
fn retain_geom_type(
    rows: OverlayRows,
    left_slots: &[Option<Geometry<f64>>],
    keep_geom_type: Option<bool>,
) -> OverlayRows {
    if keep_geom_type == Some(false) {
        return rows;
    }
    let target = left_slots
        .iter()
        .flatten()
        .filter_map(|g| geoframe_spatial::GeometryType::from_geometry(g).dimension())
        .max();
    let Some(target) = target else { return rows };

    let mut out = OverlayRows::default();
    let mut altered = false;
    for ((l, r), geom) in rows
        .left_take
        .into_iter()
        .zip(rows.right_take)
        .zip(rows.geoms)
    {
        let Some(geom) = geom else { continue };
        let mut parts = Parts::default();
        decompose_into(&geom, &mut parts);
        let filtered = Parts {
            polys: if target == 2 { parts.polys } else { Vec::new() },
            lines: if target == 1 { parts.lines } else { Vec::new() },
            points: if target == 0 { parts.points } else { Vec::new() },
        };
        match assemble_parts(filtered) {
            Some(kept) => {
                if kept != geom {
                    altered = true;
                }
                out.push(l, r, kept);
            }
            None => altered = true,
        }
    }
    if altered && keep_geom_type.is_none() {
        tracing::warn!(
            "overlay dropped or reduced mixed-type results; pass keep_geom_type to silence"
        );
    }
    out
}

/// Reject column names that would collide after `_1`/`_2` suffixing, before
/// any geometry work starts.
fn check_suffixed_names(left: &GeoFrame, right: &GeoFrame) -> Result<()> {
    let mut collisions: Vec<String> = Vec::new();
    for name in left.table().schema.names() {
        if !right.table().schema.contains(name) {
            continue;
        }
        for suffixed in [format!("{name}_1"), format!("{name}_2")] {
            if left.table().schema.contains(&suffixed) || right.table().schema.contains(&suffixed) {
                collisions.push(suffixed);
            }
        }
    }
    if collisions.is_empty() {
        Ok(())
    } else {
        collisions.sort();
        collisions.dedup();
        Err(OpsError::ColumnCollision(collisions))
    }
}

fn assemble_frame(left: &GeoFrame, right: &GeoFrame, rows: OverlayRows) -> Result<GeoFrame> {
    let shared: Vec<String> = left
        .table()
        .schema
        .names()
        .filter(|n| right.table().schema.contains(n))
        .map(|n| n.to_string())
        .collect();
    let mut left_renames = std::collections::HashMap::new();
    let mut right_renames = std::collections::HashMap::new();
    for name in &shared {
        left_renames.insert(name.clone(), format!("{name}_1"));
        right_renames.insert(name.clone(), format!("{name}_2"));
    }

    let left_part = left
        .table()
        .rename_columns(&left_renames)?
        .take_padded(&rows.left_take);
    let right_part = right
        .table()
        .rename_columns(&right_renames)?
        .take_padded(&rows.right_take);
    let table = left_part.hstack(&right_part)?;

    let crs = left.crs().or(right.crs()).cloned();
    let geometry = GeomArray::new(rows.geoms, crs);
    GeoFrame::new(table, geometry, left.geometry_column())
}
