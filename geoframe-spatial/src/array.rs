//! Geometry column: a nullable array of planar geometries with an optional
//! CRS and a lazily built, memoized spatial index.
//!
//! The array owns its geometries. The index is a snapshot: it is built on
//! first use and dropped by any mutation, so a live index always reflects
//! the current contents.

use std::sync::{Arc, OnceLock};

use geo::{Area, BooleanOps, EuclideanLength, MapCoords};
use geo_types::{Geometry, MultiPolygon, Point};

use crate::crs::Crs;
use crate::error::{Result, SpatialError};
use crate::geometry::{is_geometry_empty, parse_wkt_at, write_wkt, BBox};
use crate::sindex::SpatialIndex;
use crate::wkb::{parse_wkb, write_wkb};

/// Policy for geometries that fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnInvalid {
    /// Fail the whole construction on the first bad value.
    #[default]
    Raise,
    /// Log a warning and store a null in that slot.
    Warn,
    /// Silently store a null in that slot.
    Ignore,
}

/// Replacement values for a positional update.
#[derive(Debug, Clone)]
pub enum Values {
    /// The same value written to every target position.
    Broadcast(Option<Geometry<f64>>),
    /// One value per target position, in order.
    Elementwise(Vec<Option<Geometry<f64>>>),
}

/// A nullable geometry array with an optional CRS.
#[derive(Debug)]
pub struct GeomArray {
    geoms: Vec<Option<Geometry<f64>>>,
    crs: Option<Crs>,
    sindex: OnceLock<Arc<SpatialIndex>>,
}

impl Clone for GeomArray {
    fn clone(&self) -> Self {
        // The index snapshot is not carried over; the clone rebuilds on use.
        Self {
            geoms: self.geoms.clone(),
            crs: self.crs.clone(),
            sindex: OnceLock::new(),
        }
    }
}

impl GeomArray {
    pub fn new(geoms: Vec<Option<Geometry<f64>>>, crs: Option<Crs>) -> Self {
        Self {
            geoms,
            crs,
            sindex: OnceLock::new(),
        }
    }

    /// Decode a column of WKT strings.
    pub fn from_wkt(values: &[Option<&str>], crs: Option<Crs>, on_invalid: OnInvalid) -> Result<Self> {
        let mut geoms = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            match value {
                None => geoms.push(None),
                Some(s) => match parse_wkt_at(s, i) {
                    Ok(g) => geoms.push(Some(g)),
                    Err(err) => {
                        handle_invalid(err, on_invalid)?;
                        geoms.push(None);
                    }
                },
            }
        }
        Ok(Self::new(geoms, crs))
    }

    /// Decode a column of WKB byte strings.
    pub fn from_wkb<T: AsRef<[u8]>>(
        values: &[Option<T>],
        crs: Option<Crs>,
        on_invalid: OnInvalid,
    ) -> Result<Self> {
        let mut geoms = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            match value {
                None => geoms.push(None),
                Some(bytes) => match parse_wkb(bytes.as_ref()) {
                    Ok(g) => geoms.push(Some(g)),
                    Err(message) => {
                        handle_invalid(SpatialError::WkbParse { index: i, message }, on_invalid)?;
                        geoms.push(None);
                    }
                },
            }
        }
        Ok(Self::new(geoms, crs))
    }

    /// Build a point array from parallel coordinate slices. A NaN in x or y
    /// makes that slot null.
    ///
    /// An optional z slice is accepted for callers holding 3-D input; its
    /// length must match, but the column is planar 2-D so the z values are
    /// discarded after validation.
    pub fn points_from_xy(
        xs: &[f64],
        ys: &[f64],
        zs: Option<&[f64]>,
        crs: Option<Crs>,
    ) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(SpatialError::Construction(format!(
                "coordinate length mismatch: {} xs vs {} ys",
                xs.len(),
                ys.len()
            )));
        }
        if let Some(zs) = zs {
            if zs.len() != xs.len() {
                return Err(SpatialError::Construction(format!(
                    "coordinate length mismatch: {} xs vs {} zs",
                    xs.len(),
                    zs.len()
                )));
            }
        }
        let geoms = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| {
                if x.is_nan() || y.is_nan() {
                    None
                } else {
                    Some(Geometry::from(Point::new(x, y)))
                }
            })
            .collect();
        Ok(Self::new(geoms, crs))
    }

    pub fn len(&self) -> usize {
        self.geoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geoms.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Geometry<f64>> {
        self.geoms.get(index).and_then(|g| g.as_ref())
    }

    /// The backing slots, nulls included.
    pub fn slots(&self) -> &[Option<Geometry<f64>>] {
        &self.geoms
    }

    /// Null mask: true where the slot holds no geometry.
    pub fn is_na(&self) -> Vec<bool> {
        self.geoms.iter().map(|g| g.is_none()).collect()
    }

    /// Empty-geometry mask: true where a present geometry has no points.
    /// Null slots are missing, not empty, and yield false.
    pub fn is_empty_geoms(&self) -> Vec<bool> {
        self.geoms
            .iter()
            .map(|g| g.as_ref().map_or(false, is_geometry_empty))
            .collect()
    }

    /// Replace nulls with `value`, leaving present geometries untouched.
    pub fn fill_na(&self, value: &Geometry<f64>) -> Self {
        let geoms = self
            .geoms
            .iter()
            .map(|g| g.clone().or_else(|| Some(value.clone())))
            .collect();
        Self::new(geoms, self.crs.clone())
    }

    /// Replace nulls element-wise from another array of equal length. A slot
    /// that is null in the fill source stays null.
    pub fn fill_na_from(&self, other: &GeomArray) -> Result<Self> {
        if other.len() != self.len() {
            return Err(SpatialError::Construction(format!(
                "fill source has {} slots for an array of length {}",
                other.len(),
                self.len()
            )));
        }
        let geoms = self
            .geoms
            .iter()
            .zip(&other.geoms)
            .map(|(g, fill)| g.clone().or_else(|| fill.clone()))
            .collect();
        Ok(Self::new(geoms, self.crs.clone()))
    }

    /// Gather by index; the sentinel `-1` yields a null slot.
    pub fn take(&self, indices: &[i64]) -> Result<Self> {
        let mut geoms = Vec::with_capacity(indices.len());
        for &idx in indices {
            if idx < 0 {
                geoms.push(None);
                continue;
            }
            let idx = idx as usize;
            if idx >= self.geoms.len() {
                return Err(SpatialError::Construction(format!(
                    "take index {idx} out of bounds for array of length {}",
                    self.geoms.len()
                )));
            }
            geoms.push(self.geoms[idx].clone());
        }
        Ok(Self::new(geoms, self.crs.clone()))
    }

    /// Keep only the given positions, in the given order.
    pub fn filter_by_indices(&self, indices: &[usize]) -> Self {
        let geoms = indices
            .iter()
            .map(|&i| self.geoms[i].clone())
            .collect();
        Self::new(geoms, self.crs.clone())
    }

    pub fn slice(&self, start: usize, len: usize) -> Self {
        Self::new(self.geoms[start..start + len].to_vec(), self.crs.clone())
    }

    /// Overwrite one slot. Drops the memoized index.
    pub fn set(&mut self, index: usize, value: Option<Geometry<f64>>) -> Result<()> {
        if index >= self.geoms.len() {
            return Err(SpatialError::Construction(format!(
                "set index {index} out of bounds for array of length {}",
                self.geoms.len()
            )));
        }
        self.geoms[index] = value;
        self.sindex.take();
        Ok(())
    }

    /// Overwrite several slots. Drops the memoized index.
    pub fn set_indices(&mut self, indices: &[usize], values: Values) -> Result<()> {
        if let Values::Elementwise(ref v) = values {
            if v.len() != indices.len() {
                return Err(SpatialError::Construction(format!(
                    "got {} values for {} target positions",
                    v.len(),
                    indices.len()
                )));
            }
        }
        for (pos, &index) in indices.iter().enumerate() {
            if index >= self.geoms.len() {
                return Err(SpatialError::Construction(format!(
                    "set index {index} out of bounds for array of length {}",
                    self.geoms.len()
                )));
            }
            self.geoms[index] = match values {
                Values::Broadcast(ref v) => v.clone(),
                Values::Elementwise(ref v) => v[pos].clone(),
            };
        }
        self.sindex.take();
        Ok(())
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Assign a CRS label without touching coordinates.
    ///
    /// Relabeling an array that already carries a different CRS is almost
    /// always a mistake, so it is refused unless `allow_override` is set.
    pub fn set_crs(&mut self, crs: Option<Crs>, allow_override: bool) -> Result<()> {
        if !allow_override {
            if let (Some(current), Some(new)) = (&self.crs, &crs) {
                if current != new {
                    return Err(SpatialError::Config(format!(
                        "array already has CRS {current}; pass allow_override to replace it with {new}"
                    )));
                }
            }
        }
        self.crs = crs;
        Ok(())
    }

    /// Reproject every coordinate into `target`, producing a new array.
    ///
    /// The transform is vertex-wise: geometries spanning the antimeridian
    /// or a projection singularity are not split or densified, so long
    /// segments can land on the wrong side after reprojection.
    pub fn to_crs(&self, target: &Crs) -> Result<Self> {
        let source = self.crs.as_ref().ok_or_else(|| {
            SpatialError::MissingCrs("cannot reproject an array without a CRS".to_string())
        })?;
        if source == target {
            let mut out = self.clone();
            out.crs = Some(target.clone());
            return Ok(out);
        }
        let mut geoms = Vec::with_capacity(self.geoms.len());
        for slot in &self.geoms {
            let projected = match slot {
                None => None,
                Some(g) => Some(g.try_map_coords(|coord| {
                    let mut pair = [(coord.x, coord.y)];
                    source.transform_coords(target, &mut pair)?;
                    Ok::<_, SpatialError>(geo_types::Coord {
                        x: pair[0].0,
                        y: pair[0].1,
                    })
                })?),
            };
            geoms.push(projected);
        }
        tracing::debug!(from = %source, to = %target, n = geoms.len(), "reprojected geometry array");
        Ok(Self::new(geoms, Some(target.clone())))
    }

    /// Encode to WKT, nulls preserved.
    pub fn to_wkt(&self) -> Vec<Option<String>> {
        self.geoms
            .iter()
            .map(|g| g.as_ref().map(write_wkt))
            .collect()
    }

    /// Encode to little-endian WKB, nulls preserved.
    pub fn to_wkb(&self) -> Vec<Option<Vec<u8>>> {
        self.geoms
            .iter()
            .map(|g| g.as_ref().map(write_wkb))
            .collect()
    }

    /// The spatial index over the current contents, building it on first use.
    pub fn sindex(&self) -> Arc<SpatialIndex> {
        self.sindex
            .get_or_init(|| Arc::new(SpatialIndex::new(&self.geoms)))
            .clone()
    }

    /// Whether the index has already been built for the current contents.
    pub fn has_sindex(&self) -> bool {
        self.sindex.get().is_some()
    }

    /// Planar area per geometry; null slots yield null, non-areal
    /// geometries yield zero.
    pub fn area(&self) -> Vec<Option<f64>> {
        self.geoms
            .iter()
            .map(|g| g.as_ref().map(|g| g.unsigned_area()))
            .collect()
    }

    /// Planar length per geometry. Polygons measure their ring perimeters.
    pub fn length(&self) -> Vec<Option<f64>> {
        self.geoms
            .iter()
            .map(|g| g.as_ref().map(geometry_length))
            .collect()
    }

    /// Bounding box per geometry; null for null or empty slots.
    pub fn bounds(&self) -> Vec<Option<BBox>> {
        self.geoms
            .iter()
            .map(|g| g.as_ref().and_then(BBox::from_geometry))
            .collect()
    }

    /// Bounding box over the whole array, or `None` if nothing has extent.
    pub fn total_bounds(&self) -> Option<BBox> {
        let mut acc: Option<BBox> = None;
        for bbox in self.bounds().into_iter().flatten() {
            acc = Some(match acc {
                None => bbox,
                Some(prev) => BBox::new(
                    prev.min_x.min(bbox.min_x),
                    prev.min_y.min(bbox.min_y),
                    prev.max_x.max(bbox.max_x),
                    prev.max_y.max(bbox.max_y),
                ),
            });
        }
        acc
    }

    /// Union of every non-null, non-empty geometry in the array.
    ///
    /// Areal parts are dissolved into one multipolygon; lower-dimension
    /// parts are carried alongside in a collection when present.
    pub fn unary_union(&self) -> Geometry<f64> {
        let mut polygons: Vec<MultiPolygon<f64>> = Vec::new();
        let mut others: Vec<Geometry<f64>> = Vec::new();
        for geom in self.geoms.iter().flatten() {
            if is_geometry_empty(geom) {
                continue;
            }
            match geom {
                Geometry::Polygon(p) => polygons.push(MultiPolygon(vec![p.clone()])),
                Geometry::MultiPolygon(mp) => polygons.push(mp.clone()),
                other => others.push(other.clone()),
            }
        }
        let dissolved = polygons
            .into_iter()
            .reduce(|acc, next| acc.union(&next))
            .map(Geometry::MultiPolygon);
        match (dissolved, others.is_empty()) {
            (Some(d), true) => d,
            (None, true) => Geometry::GeometryCollection(geo_types::GeometryCollection::default()),
            (None, false) if others.len() == 1 => others.pop().unwrap_or_else(|| {
                Geometry::GeometryCollection(geo_types::GeometryCollection::default())
            }),
            (dissolved, _) => {
                let mut parts = others;
                if let Some(d) = dissolved {
                    parts.push(d);
                }
                Geometry::GeometryCollection(geo_types::GeometryCollection(parts))
            }
        }
    }
}

fn handle_invalid(err: SpatialError, on_invalid: OnInvalid) -> Result<()> {
    match on_invalid {
        OnInvalid::Raise => Err(err),
        OnInvalid::Warn => {
            tracing::warn!(error = %err, "dropping invalid geometry");
            Ok(())
        }
        OnInvalid::Ignore => Ok(()),
    }
}

/// Perimeter-style length over any geometry variant.
fn geometry_length(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Point(_) | Geometry::MultiPoint(_) => 0.0,
        Geometry::Line(l) => l.euclidean_length(),
        Geometry::LineString(ls) => ls.euclidean_length(),
        Geometry::MultiLineString(mls) => mls.euclidean_length(),
        Geometry::Polygon(p) => {
            p.exterior().euclidean_length()
                + p.interiors().iter().map(EuclideanLength::euclidean_length).sum::<f64>()
        }
        Geometry::MultiPolygon(mp) => mp.0.iter().map(|p| geometry_length(&Geometry::Polygon(p.clone()))).sum(),
        Geometry::Rect(r) => geometry_length(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => geometry_length(&Geometry::Polygon(t.to_polygon())),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(geometry_length).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::parse_wkt;
    use approx::assert_relative_eq;

    fn square() -> Geometry<f64> {
        parse_wkt("POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))").unwrap()
    }

    #[test]
    fn test_from_wkt_policies() {
        let values = vec![Some("POINT(1 2)"), Some("not wkt"), None];
        assert!(GeomArray::from_wkt(&values, None, OnInvalid::Raise).is_err());

        let arr = GeomArray::from_wkt(&values, None, OnInvalid::Ignore).unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.is_na(), vec![false, true, true]);
    }

    #[test]
    fn test_wkb_round_trip_preserves_nulls() {
        let arr = GeomArray::from_wkt(
            &[Some("POINT(1 2)"), None, Some("LINESTRING(0 0, 1 1)")],
            None,
            OnInvalid::Raise,
        )
        .unwrap();
        let wkb = arr.to_wkb();
        assert!(wkb[1].is_none());
        let back = GeomArray::from_wkb(&wkb, None, OnInvalid::Raise).unwrap();
        assert_eq!(back.is_na(), arr.is_na());
        assert_eq!(back.get(0), arr.get(0));
    }

    #[test]
    fn test_points_from_xy_length_mismatch() {
        assert!(GeomArray::points_from_xy(&[0.0, 1.0], &[0.0], None, None).is_err());
        assert!(GeomArray::points_from_xy(&[0.0, 1.0], &[2.0, 3.0], Some(&[9.0]), None).is_err());
        let arr = GeomArray::points_from_xy(&[0.0, 1.0], &[2.0, 3.0], None, None).unwrap();
        assert_eq!(arr.get(1), Some(&Geometry::from(Point::new(1.0, 3.0))));
    }

    #[test]
    fn test_points_from_xy_discards_z() {
        let arr =
            GeomArray::points_from_xy(&[1.0, 2.0], &[3.0, 4.0], Some(&[7.0, 8.0]), None).unwrap();
        assert_eq!(arr.get(0), Some(&Geometry::from(Point::new(1.0, 3.0))));
        assert_eq!(arr.get(1), Some(&Geometry::from(Point::new(2.0, 4.0))));
    }

    #[test]
    fn test_points_from_xy_nan_is_null() {
        let arr = GeomArray::points_from_xy(&[0.0, f64::NAN], &[0.0, 1.0], None, None).unwrap();
        assert_eq!(arr.is_na(), vec![false, true]);
    }

    #[test]
    fn test_empty_mask_distinct_from_null_mask() {
        let arr = GeomArray::new(
            vec![
                Some(parse_wkt("POINT(1 1)").unwrap()),
                Some(parse_wkt("POLYGON EMPTY").unwrap()),
                None,
            ],
            None,
        );
        assert_eq!(arr.is_na(), vec![false, false, true]);
        assert_eq!(arr.is_empty_geoms(), vec![false, true, false]);
    }

    #[test]
    fn test_fill_na_broadcast_and_elementwise() {
        let point = parse_wkt("POINT(9 9)").unwrap();
        let arr = GeomArray::new(vec![Some(point.clone()), None, None], None);

        let filled = arr.fill_na(&square());
        assert_eq!(filled.is_na(), vec![false, false, false]);
        assert_eq!(filled.get(0), Some(&point));
        assert_eq!(filled.get(1), Some(&square()));

        let fills = GeomArray::new(vec![Some(square()), Some(square()), None], None);
        let filled = arr.fill_na_from(&fills).unwrap();
        assert_eq!(filled.get(0), Some(&point));
        assert_eq!(filled.get(1), Some(&square()));
        assert_eq!(filled.is_na(), vec![false, false, true]);

        let short = GeomArray::new(vec![None], None);
        assert!(arr.fill_na_from(&short).is_err());
    }

    #[test]
    fn test_take_with_sentinel() {
        let arr = GeomArray::points_from_xy(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0], None, None).unwrap();
        let taken = arr.take(&[2, -1, 0]).unwrap();
        assert_eq!(taken.is_na(), vec![false, true, false]);
        assert_eq!(taken.get(0), arr.get(2));
        assert!(arr.take(&[3]).is_err());
    }

    #[test]
    fn test_mutation_drops_index() {
        let mut arr = GeomArray::points_from_xy(&[0.0, 5.0], &[0.0, 5.0], None, None).unwrap();
        let index = arr.sindex();
        assert!(arr.has_sindex());
        assert_eq!(index.size(), 2);

        arr.set(0, None).unwrap();
        assert!(!arr.has_sindex());
        let rebuilt = arr.sindex();
        assert_eq!(rebuilt.size(), 2);
        let probe = parse_wkt("POLYGON((-1 -1, 1 -1, 1 1, -1 1, -1 -1))").unwrap();
        assert!(rebuilt.query(&probe, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_set_indices_broadcast_and_elementwise() {
        let mut arr = GeomArray::points_from_xy(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0], None, None).unwrap();
        arr.set_indices(&[0, 2], Values::Broadcast(None)).unwrap();
        assert_eq!(arr.is_na(), vec![true, false, true]);

        let err = arr.set_indices(&[0], Values::Elementwise(vec![None, None]));
        assert!(err.is_err());
    }

    #[test]
    fn test_set_crs_override_guard() {
        let mut arr = GeomArray::points_from_xy(&[0.0], &[0.0], None, None).unwrap();
        let wgs84 = Crs::from_epsg(4326).unwrap();
        let mercator = Crs::from_epsg(3857).unwrap();
        arr.set_crs(Some(wgs84.clone()), false).unwrap();
        assert!(arr.set_crs(Some(mercator.clone()), false).is_err());
        arr.set_crs(Some(mercator.clone()), true).unwrap();
        assert_eq!(arr.crs(), Some(&mercator));
    }

    #[test]
    fn test_to_crs() {
        let arr = GeomArray::points_from_xy(&[0.0, 180.0], &[0.0, 0.0], None, Some(Crs::from_epsg(4326).unwrap()))
            .unwrap();
        let projected = arr.to_crs(&Crs::from_epsg(3857).unwrap()).unwrap();
        let Some(Geometry::Point(p)) = projected.get(1).cloned() else {
            panic!("expected a point");
        };
        assert_relative_eq!(p.x(), 20037508.342789244, max_relative = 1e-9);
        assert_relative_eq!(p.y(), 0.0, epsilon = 1e-6);

        let bare = GeomArray::points_from_xy(&[0.0], &[0.0], None, None).unwrap();
        assert!(bare.to_crs(&Crs::from_epsg(3857).unwrap()).is_err());
    }

    #[test]
    fn test_measures() {
        let arr = GeomArray::new(
            vec![Some(square()), Some(parse_wkt("LINESTRING(0 0, 3 4)").unwrap()), None],
            None,
        );
        assert_eq!(arr.area(), vec![Some(4.0), Some(0.0), None]);
        assert_eq!(arr.length(), vec![Some(8.0), Some(5.0), None]);

        let total = arr.total_bounds().unwrap();
        assert_eq!((total.min_x, total.min_y, total.max_x, total.max_y), (0.0, 0.0, 3.0, 4.0));
    }

    #[test]
    fn test_unary_union_dissolves_overlap() {
        let arr = GeomArray::new(
            vec![
                Some(square()),
                Some(parse_wkt("POLYGON((1 0, 3 0, 3 2, 1 2, 1 0))").unwrap()),
            ],
            None,
        );
        let Geometry::MultiPolygon(mp) = arr.unary_union() else {
            panic!("expected a multipolygon");
        };
        assert_relative_eq!(mp.unsigned_area(), 6.0, max_relative = 1e-9);
    }
}
