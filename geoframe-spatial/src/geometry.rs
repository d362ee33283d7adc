//! Geometry helpers: type classification, bounding boxes, WKT codec,
//! empty-geometry detection.
//!
//! Bounding boxes are always planar 2-D; a Z coordinate, when present in the
//! source data, is ignored for indexing and predicate prefiltering.

use geo::{BoundingRect, HasDimensions};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpatialError};

/// Geometry type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GeometryType {
    Point = 0,
    LineString = 1,
    Polygon = 2,
    MultiPoint = 3,
    MultiLineString = 4,
    MultiPolygon = 5,
    GeometryCollection = 6,
}

impl GeometryType {
    /// Classify a geo-types Geometry.
    pub fn from_geometry(geom: &Geometry<f64>) -> Self {
        match geom {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::Line(_) | Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
                GeometryType::Polygon
            }
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    /// Topological dimension of this kind: 0 for points, 1 for lines,
    /// 2 for polygons. Collections report the maximum of their parts and
    /// are handled by the caller.
    pub fn dimension(&self) -> Option<u8> {
        match self {
            GeometryType::Point | GeometryType::MultiPoint => Some(0),
            GeometryType::LineString | GeometryType::MultiLineString => Some(1),
            GeometryType::Polygon | GeometryType::MultiPolygon => Some(2),
            GeometryType::GeometryCollection => None,
        }
    }
}

/// Axis-aligned planar bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Check if this bbox fully contains another bbox.
    pub fn contains_bbox(&self, other: &BBox) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Grow the box by `d` on every side.
    pub fn expand(&self, d: f64) -> Self {
        Self {
            min_x: self.min_x - d,
            min_y: self.min_y - d,
            max_x: self.max_x + d,
            max_y: self.max_y + d,
        }
    }

    /// Compute from a geo-types Geometry. Returns `None` for empty input.
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }
}

/// Check whether a geometry is empty (present but containing no coordinates).
///
/// Empty is not the same as null: an empty polygon is a concrete value,
/// carried through serialization, that simply never matches any predicate.
pub fn is_geometry_empty(geom: &Geometry<f64>) -> bool {
    geom.is_empty()
}

/// Parse a WKT string to a geo-types Geometry.
pub fn parse_wkt(s: &str) -> std::result::Result<Geometry<f64>, String> {
    use std::str::FromStr;
    wkt::Wkt::from_str(s)
        .map_err(|e| format!("{:?}", e))
        .and_then(|w: wkt::Wkt<f64>| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| format!("{:?}", e))
        })
}

/// Parse a WKT string, attributing failures to the element at `index`.
pub fn parse_wkt_at(s: &str, index: usize) -> Result<Geometry<f64>> {
    parse_wkt(s).map_err(|message| SpatialError::WktParse { index, message })
}

/// Serialize a geometry to WKT.
pub fn write_wkt(geom: &Geometry<f64>) -> String {
    use wkt::ToWkt;
    geom.wkt_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Point};

    #[test]
    fn test_parse_polygon() {
        let geom = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert!(matches!(geom, Geometry::Polygon(_)));
        assert_eq!(GeometryType::from_geometry(&geom), GeometryType::Polygon);
    }

    #[test]
    fn test_bbox_computation() {
        let geom = parse_wkt("POLYGON((0 0, 10 0, 10 20, 0 20, 0 0))").unwrap();
        let bbox = BBox::from_geometry(&geom).unwrap();
        assert_eq!(bbox.min_x, 0.0);
        assert_eq!(bbox.max_x, 10.0);
        assert_eq!(bbox.min_y, 0.0);
        assert_eq!(bbox.max_y, 20.0);
    }

    #[test]
    fn test_bbox_intersects_and_contains() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BBox::new(2.0, 2.0, 3.0, 3.0);
        assert!(a.intersects(&b));
        assert!(a.contains_bbox(&c));
        assert!(!c.intersects(&b));
        assert!(a.expand(10.0).contains_bbox(&b));
    }

    #[test]
    fn test_empty_polygon_is_empty_not_null() {
        let geom = parse_wkt("POLYGON EMPTY").unwrap();
        assert!(is_geometry_empty(&geom));
        let point: Geometry<f64> = Point::new(1.0, 2.0).into();
        assert!(!is_geometry_empty(&point));
    }

    #[test]
    fn test_wkt_round_trip() {
        let geom: Geometry<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]
        .into();
        let recovered = parse_wkt(&write_wkt(&geom)).unwrap();
        assert_eq!(geom, recovered);
    }

    #[test]
    fn test_dimension() {
        assert_eq!(GeometryType::Point.dimension(), Some(0));
        assert_eq!(GeometryType::MultiLineString.dimension(), Some(1));
        assert_eq!(GeometryType::MultiPolygon.dimension(), Some(2));
        assert_eq!(GeometryType::GeometryCollection.dimension(), None);
    }
}
