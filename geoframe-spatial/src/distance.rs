//! Planar geometry-to-geometry distance.
//!
//! Distance between intersecting geometries is zero; between disjoint
//! geometries it is the minimum distance between their decomposed point and
//! segment sets. Containment cases collapse into the intersection check, so
//! boundary distance is exact for the disjoint remainder.

use geo::{HasDimensions, Intersects};
use geo_types::{Coord, Geometry, Line, LineString, Polygon};

/// Minimum planar distance between two geometries.
///
/// Returns `f64::INFINITY` when either side is empty; empty geometries are
/// never "near" anything.
pub fn geometry_distance(a: &Geometry<f64>, b: &Geometry<f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    if a.intersects(b) {
        return 0.0;
    }

    let mut da = Decomposed::default();
    decompose(a, &mut da);
    let mut db = Decomposed::default();
    decompose(b, &mut db);

    let mut min = f64::INFINITY;
    for &p in &da.points {
        for &q in &db.points {
            min = min.min(point_point(p, q));
        }
        for seg in &db.segments {
            min = min.min(point_segment(p, seg));
        }
    }
    for seg in &da.segments {
        for &q in &db.points {
            min = min.min(point_segment(q, seg));
        }
        for other in &db.segments {
            min = min.min(segment_segment(seg, other));
        }
    }
    min
}

#[derive(Default)]
struct Decomposed {
    points: Vec<Coord<f64>>,
    segments: Vec<Line<f64>>,
}

fn decompose(geom: &Geometry<f64>, out: &mut Decomposed) {
    match geom {
        Geometry::Point(p) => out.points.push(p.0),
        Geometry::Line(l) => out.segments.push(*l),
        Geometry::LineString(ls) => decompose_linestring(ls, out),
        Geometry::Polygon(p) => decompose_polygon(p, out),
        Geometry::Rect(r) => decompose_polygon(&r.to_polygon(), out),
        Geometry::Triangle(t) => decompose_polygon(&t.to_polygon(), out),
        Geometry::MultiPoint(mp) => out.points.extend(mp.0.iter().map(|p| p.0)),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                decompose_linestring(ls, out);
            }
        }
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                decompose_polygon(p, out);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                decompose(g, out);
            }
        }
    }
}

fn decompose_linestring(ls: &LineString<f64>, out: &mut Decomposed) {
    if ls.0.len() == 1 {
        out.points.push(ls.0[0]);
        return;
    }
    out.segments.extend(ls.lines());
}

fn decompose_polygon(poly: &Polygon<f64>, out: &mut Decomposed) {
    decompose_linestring(poly.exterior(), out);
    for ring in poly.interiors() {
        decompose_linestring(ring, out);
    }
}

fn point_point(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn point_segment(p: Coord<f64>, seg: &Line<f64>) -> f64 {
    let dx = seg.end.x - seg.start.x;
    let dy = seg.end.y - seg.start.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return point_point(p, seg.start);
    }
    let t = ((p.x - seg.start.x) * dx + (p.y - seg.start.y) * dy) / len2;
    let t = t.clamp(0.0, 1.0);
    let proj = Coord {
        x: seg.start.x + t * dx,
        y: seg.start.y + t * dy,
    };
    point_point(p, proj)
}

fn segment_segment(a: &Line<f64>, b: &Line<f64>) -> f64 {
    if a.intersects(b) {
        return 0.0;
    }
    point_segment(a.start, b)
        .min(point_segment(a.end, b))
        .min(point_segment(b.start, a))
        .min(point_segment(b.end, a))
}
