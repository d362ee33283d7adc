//! OGC Well-Known Binary codec.
//!
//! Reads both byte orders, writes little-endian. Supports the seven standard
//! geometry kinds, with `GeometryCollection` nesting. Z/M flags (ISO or
//! PostGIS-style) are rejected rather than silently misread; the column type
//! is planar 2-D.

use std::io::{Cursor, Read};

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};

/// Byte order marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    fn from_byte(byte: u8) -> Result<Self, String> {
        match byte {
            0x00 => Ok(ByteOrder::BigEndian),
            0x01 => Ok(ByteOrder::LittleEndian),
            _ => Err(format!("invalid byte order marker: {}", byte)),
        }
    }
}

mod type_codes {
    pub const POINT: u32 = 1;
    pub const LINESTRING: u32 = 2;
    pub const POLYGON: u32 = 3;
    pub const MULTIPOINT: u32 = 4;
    pub const MULTILINESTRING: u32 = 5;
    pub const MULTIPOLYGON: u32 = 6;
    pub const GEOMETRY_COLLECTION: u32 = 7;

    /// ISO WKB Z types start at 1001; PostGIS EWKB uses high-bit flags.
    pub const EWKB_FLAGS: u32 = 0xE000_0000;
}

/// Decode a WKB byte slice into a geometry.
pub fn parse_wkb(data: &[u8]) -> Result<Geometry<f64>, String> {
    let mut cursor = Cursor::new(data);
    let geom = parse_geometry(&mut cursor)?;
    if cursor.position() != data.len() as u64 {
        return Err(format!(
            "trailing bytes after geometry: {} of {} consumed",
            cursor.position(),
            data.len()
        ));
    }
    Ok(geom)
}

fn parse_geometry(cursor: &mut Cursor<&[u8]>) -> Result<Geometry<f64>, String> {
    let order = ByteOrder::from_byte(read_u8(cursor)?)?;
    let type_code = read_u32(cursor, order)?;

    if type_code & type_codes::EWKB_FLAGS != 0 || type_code > 1000 {
        return Err(format!(
            "unsupported WKB type code {:#x} (Z/M or EWKB geometries are not planar 2-D)",
            type_code
        ));
    }

    match type_code {
        type_codes::POINT => Ok(Geometry::Point(parse_point(cursor, order)?)),
        type_codes::LINESTRING => Ok(Geometry::LineString(parse_linestring(cursor, order)?)),
        type_codes::POLYGON => Ok(Geometry::Polygon(parse_polygon(cursor, order)?)),
        type_codes::MULTIPOINT => {
            let n = read_count(cursor, order, NESTED_HEADER_BYTES)?;
            let mut points = Vec::with_capacity(n);
            for _ in 0..n {
                match parse_geometry(cursor)? {
                    Geometry::Point(p) => points.push(p),
                    other => {
                        return Err(format!(
                            "MultiPoint member is not a point: {:?}",
                            crate::geometry::GeometryType::from_geometry(&other)
                        ))
                    }
                }
            }
            Ok(Geometry::MultiPoint(MultiPoint(points)))
        }
        type_codes::MULTILINESTRING => {
            let n = read_count(cursor, order, NESTED_HEADER_BYTES)?;
            let mut lines = Vec::with_capacity(n);
            for _ in 0..n {
                match parse_geometry(cursor)? {
                    Geometry::LineString(ls) => lines.push(ls),
                    _ => return Err("MultiLineString member is not a linestring".to_string()),
                }
            }
            Ok(Geometry::MultiLineString(MultiLineString(lines)))
        }
        type_codes::MULTIPOLYGON => {
            let n = read_count(cursor, order, NESTED_HEADER_BYTES)?;
            let mut polys = Vec::with_capacity(n);
            for _ in 0..n {
                match parse_geometry(cursor)? {
                    Geometry::Polygon(p) => polys.push(p),
                    _ => return Err("MultiPolygon member is not a polygon".to_string()),
                }
            }
            Ok(Geometry::MultiPolygon(MultiPolygon(polys)))
        }
        type_codes::GEOMETRY_COLLECTION => {
            let n = read_count(cursor, order, NESTED_HEADER_BYTES)?;
            let mut geoms = Vec::with_capacity(n);
            for _ in 0..n {
                geoms.push(parse_geometry(cursor)?);
            }
            Ok(Geometry::GeometryCollection(GeometryCollection(geoms)))
        }
        other => Err(format!("unsupported WKB type code: {}", other)),
    }
}

fn parse_point(cursor: &mut Cursor<&[u8]>, order: ByteOrder) -> Result<Point<f64>, String> {
    let x = read_f64(cursor, order)?;
    let y = read_f64(cursor, order)?;
    Ok(Point::new(x, y))
}

fn parse_linestring(
    cursor: &mut Cursor<&[u8]>,
    order: ByteOrder,
) -> Result<LineString<f64>, String> {
    let n = read_count(cursor, order, COORD_BYTES)?;
    let mut coords = Vec::with_capacity(n);
    for _ in 0..n {
        let x = read_f64(cursor, order)?;
        let y = read_f64(cursor, order)?;
        coords.push(Coord { x, y });
    }
    Ok(LineString(coords))
}

fn parse_polygon(cursor: &mut Cursor<&[u8]>, order: ByteOrder) -> Result<Polygon<f64>, String> {
    // Each ring carries at least its own coordinate count.
    let n_rings = read_count(cursor, order, 4)?;
    if n_rings == 0 {
        return Ok(Polygon::new(LineString(Vec::new()), Vec::new()));
    }
    let exterior = parse_linestring(cursor, order)?;
    let mut interiors = Vec::with_capacity(n_rings - 1);
    for _ in 1..n_rings {
        interiors.push(parse_linestring(cursor, order)?);
    }
    Ok(Polygon::new(exterior, interiors))
}

/// Encode a geometry as little-endian WKB.
pub fn write_wkb(geom: &Geometry<f64>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    write_geometry(&mut buf, geom);
    buf
}

fn write_geometry(buf: &mut Vec<u8>, geom: &Geometry<f64>) {
    buf.push(0x01); // little endian
    match geom {
        Geometry::Point(p) => {
            write_u32(buf, type_codes::POINT);
            write_coord(buf, p.0);
        }
        Geometry::Line(l) => {
            write_u32(buf, type_codes::LINESTRING);
            write_u32(buf, 2);
            write_coord(buf, l.start);
            write_coord(buf, l.end);
        }
        Geometry::LineString(ls) => {
            write_u32(buf, type_codes::LINESTRING);
            write_linestring(buf, ls);
        }
        Geometry::Polygon(p) => {
            write_u32(buf, type_codes::POLYGON);
            write_polygon(buf, p);
        }
        Geometry::Rect(r) => {
            write_u32(buf, type_codes::POLYGON);
            write_polygon(buf, &r.to_polygon());
        }
        Geometry::Triangle(t) => {
            write_u32(buf, type_codes::POLYGON);
            write_polygon(buf, &t.to_polygon());
        }
        Geometry::MultiPoint(mp) => {
            write_u32(buf, type_codes::MULTIPOINT);
            write_u32(buf, mp.0.len() as u32);
            for p in &mp.0 {
                write_geometry(buf, &Geometry::Point(*p));
            }
        }
        Geometry::MultiLineString(mls) => {
            write_u32(buf, type_codes::MULTILINESTRING);
            write_u32(buf, mls.0.len() as u32);
            for ls in &mls.0 {
                buf.push(0x01);
                write_u32(buf, type_codes::LINESTRING);
                write_linestring(buf, ls);
            }
        }
        Geometry::MultiPolygon(mp) => {
            write_u32(buf, type_codes::MULTIPOLYGON);
            write_u32(buf, mp.0.len() as u32);
            for p in &mp.0 {
                buf.push(0x01);
                write_u32(buf, type_codes::POLYGON);
                write_polygon(buf, p);
            }
        }
        Geometry::GeometryCollection(gc) => {
            write_u32(buf, type_codes::GEOMETRY_COLLECTION);
            write_u32(buf, gc.0.len() as u32);
            for g in &gc.0 {
                write_geometry(buf, g);
            }
        }
    }
}

fn write_linestring(buf: &mut Vec<u8>, ls: &LineString<f64>) {
    write_u32(buf, ls.0.len() as u32);
    for c in &ls.0 {
        write_coord(buf, *c);
    }
}

fn write_polygon(buf: &mut Vec<u8>, poly: &Polygon<f64>) {
    if poly.exterior().0.is_empty() && poly.interiors().is_empty() {
        write_u32(buf, 0);
        return;
    }
    write_u32(buf, 1 + poly.interiors().len() as u32);
    write_linestring(buf, poly.exterior());
    for ring in poly.interiors() {
        write_linestring(buf, ring);
    }
}

fn write_coord(buf: &mut Vec<u8>, c: Coord<f64>) {
    buf.extend_from_slice(&c.x.to_le_bytes());
    buf.extend_from_slice(&c.y.to_le_bytes());
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Smallest possible encoding of a nested geometry: byte order plus type code.
const NESTED_HEADER_BYTES: u64 = 5;
/// One planar coordinate pair.
const COORD_BYTES: u64 = 16;

/// Read an element count and bound it by the bytes still available, so a
/// corrupt count fails as a decode error instead of driving an allocation.
fn read_count(
    cursor: &mut Cursor<&[u8]>,
    order: ByteOrder,
    min_member_bytes: u64,
) -> Result<usize, String> {
    let n = read_u32(cursor, order)? as u64;
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if n.saturating_mul(min_member_bytes) > remaining {
        return Err("unexpected end of WKB".to_string());
    }
    Ok(n as usize)
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, String> {
    let mut b = [0u8; 1];
    cursor
        .read_exact(&mut b)
        .map_err(|_| "unexpected end of WKB".to_string())?;
    Ok(b[0])
}

fn read_u32(cursor: &mut Cursor<&[u8]>, order: ByteOrder) -> Result<u32, String> {
    let mut b = [0u8; 4];
    cursor
        .read_exact(&mut b)
        .map_err(|_| "unexpected end of WKB".to_string())?;
    Ok(match order {
        ByteOrder::LittleEndian => u32::from_le_bytes(b),
        ByteOrder::BigEndian => u32::from_be_bytes(b),
    })
}

fn read_f64(cursor: &mut Cursor<&[u8]>, order: ByteOrder) -> Result<f64, String> {
    let mut b = [0u8; 8];
    cursor
        .read_exact(&mut b)
        .map_err(|_| "unexpected end of WKB".to_string())?;
    Ok(match order {
        ByteOrder::LittleEndian => f64::from_le_bytes(b),
        ByteOrder::BigEndian => f64::from_be_bytes(b),
    })
}
