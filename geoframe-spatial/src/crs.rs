//! Coordinate reference system handling.
//!
//! A [`Crs`] is an opaque, equality-comparable descriptor attached to a whole
//! geometry column (never per-element). It parses from EPSG authority strings
//! or raw proj strings, and drives vertex-wise coordinate transformation
//! through the pure-Rust proj port.

use proj4rs::Proj;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpatialError};

/// A coordinate reference system descriptor.
///
/// Two CRSs compare equal when their EPSG codes match (if both are known),
/// falling back to comparison of their proj definitions otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crs {
    /// EPSG code, when the CRS was created from one.
    epsg: Option<u32>,
    /// Proj definition string.
    proj4: String,
}

impl Crs {
    /// Create a CRS from an EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self> {
        let short = u16::try_from(code)
            .map_err(|_| SpatialError::UnknownCrs(format!("EPSG:{}", code)))?;
        let def = crs_definitions::from_code(short)
            .ok_or_else(|| SpatialError::UnknownCrs(format!("EPSG:{}", code)))?;
        Ok(Self {
            epsg: Some(code),
            proj4: def.proj4.to_string(),
        })
    }

    /// Create a CRS from user input: an `EPSG:<code>` authority string,
    /// a bare numeric code, or a proj string.
    pub fn from_user_input(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if let Some(rest) = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
        {
            let code: u32 = rest
                .parse()
                .map_err(|_| SpatialError::UnknownCrs(trimmed.to_string()))?;
            return Self::from_epsg(code);
        }
        if let Ok(code) = trimmed.parse::<u32>() {
            return Self::from_epsg(code);
        }
        if trimmed.starts_with('+') {
            // Validate eagerly so a bad definition fails at construction,
            // not at first transform.
            Proj::from_proj_string(trimmed)
                .map_err(|e| SpatialError::UnknownCrs(format!("{}: {}", trimmed, e)))?;
            return Ok(Self {
                epsg: None,
                proj4: trimmed.to_string(),
            });
        }
        Err(SpatialError::UnknownCrs(trimmed.to_string()))
    }

    /// The EPSG code, when known.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// The proj definition string.
    pub fn proj4(&self) -> &str {
        &self.proj4
    }

    fn to_proj(&self) -> Result<Proj> {
        Proj::from_proj_string(&self.proj4)
            .map_err(|e| SpatialError::Projection(format!("{}: {}", self, e)))
    }

    /// Transform coordinate pairs from this CRS into `to`, in place.
    ///
    /// Geographic CRSs operate in degrees at this interface; the conversion
    /// to the radians the projection kernel expects happens here.
    pub fn transform_coords(&self, to: &Crs, coords: &mut [(f64, f64)]) -> Result<()> {
        let src = self.to_proj()?;
        let dst = to.to_proj()?;
        let src_geographic = src.is_latlong();
        let dst_geographic = dst.is_latlong();

        for coord in coords.iter_mut() {
            let mut point = if src_geographic {
                (coord.0.to_radians(), coord.1.to_radians(), 0.0)
            } else {
                (coord.0, coord.1, 0.0)
            };
            proj4rs::transform::transform(&src, &dst, &mut point)
                .map_err(|e| SpatialError::Projection(e.to_string()))?;
            *coord = if dst_geographic {
                (point.0.to_degrees(), point.1.to_degrees())
            } else {
                (point.0, point.1)
            };
        }
        Ok(())
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => self.proj4.trim() == other.proj4.trim(),
        }
    }
}

impl Eq for Crs {}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "{}", self.proj4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_authority_string() {
        let crs = Crs::from_user_input("EPSG:4326").unwrap();
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs, Crs::from_epsg(4326).unwrap());
        assert_eq!(crs.to_string(), "EPSG:4326");
    }

    #[test]
    fn test_unknown_crs_rejected() {
        assert!(Crs::from_user_input("not-a-crs").is_err());
        assert!(Crs::from_user_input("EPSG:0").is_err());
    }

    #[test]
    fn test_equality_across_sources() {
        let a = Crs::from_epsg(3857).unwrap();
        let b = Crs::from_user_input("3857").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Crs::from_epsg(4326).unwrap());
    }

    #[test]
    fn test_transform_wgs84_to_web_mercator() {
        let wgs84 = Crs::from_epsg(4326).unwrap();
        let mercator = Crs::from_epsg(3857).unwrap();

        let mut coords = vec![(0.0, 0.0), (180.0, 0.0)];
        wgs84.transform_coords(&mercator, &mut coords).unwrap();

        assert_relative_eq!(coords[0].0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(coords[0].1, 0.0, epsilon = 1e-6);
        // Web Mercator world half-width.
        assert_relative_eq!(coords[1].0, 20037508.342789244, epsilon = 1e-3);
    }

    #[test]
    fn test_transform_round_trip() {
        let wgs84 = Crs::from_epsg(4326).unwrap();
        let mercator = Crs::from_epsg(3857).unwrap();

        let mut coords = vec![(12.5, 41.9)];
        wgs84.transform_coords(&mercator, &mut coords).unwrap();
        mercator.transform_coords(&wgs84, &mut coords).unwrap();

        assert_relative_eq!(coords[0].0, 12.5, epsilon = 1e-8);
        assert_relative_eq!(coords[0].1, 41.9, epsilon = 1e-8);
    }
}
