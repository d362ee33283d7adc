//! Binary topological predicates.
//!
//! The registry of predicate names accepted by [`crate::sindex::SpatialIndex`]
//! queries, and their exact evaluation. Bounding boxes prefilter candidates;
//! the functions here decide final inclusion.

use geo::{Contains, Intersects, Relate, Within};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::distance::geometry_distance;
use crate::error::{Result, SpatialError};
use crate::geometry::is_geometry_empty;

/// Binary predicates supported by spatial index queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryPredicate {
    Intersects,
    Within,
    Contains,
    ContainsProperly,
    Covers,
    CoveredBy,
    Crosses,
    Touches,
    Overlaps,
    Dwithin,
}

/// All predicates accepted by this engine, in registry order.
pub const VALID_PREDICATES: &[BinaryPredicate] = &[
    BinaryPredicate::Intersects,
    BinaryPredicate::Within,
    BinaryPredicate::Contains,
    BinaryPredicate::ContainsProperly,
    BinaryPredicate::Covers,
    BinaryPredicate::CoveredBy,
    BinaryPredicate::Crosses,
    BinaryPredicate::Touches,
    BinaryPredicate::Overlaps,
    BinaryPredicate::Dwithin,
];

impl BinaryPredicate {
    /// Registry name of this predicate.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intersects => "intersects",
            Self::Within => "within",
            Self::Contains => "contains",
            Self::ContainsProperly => "contains_properly",
            Self::Covers => "covers",
            Self::CoveredBy => "covered_by",
            Self::Crosses => "crosses",
            Self::Touches => "touches",
            Self::Overlaps => "overlaps",
            Self::Dwithin => "dwithin",
        }
    }

    /// Whether this predicate requires a `distance` argument.
    pub fn requires_distance(&self) -> bool {
        matches!(self, Self::Dwithin)
    }
}

impl std::str::FromStr for BinaryPredicate {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        VALID_PREDICATES
            .iter()
            .find(|p| p.name() == s)
            .copied()
            .ok_or_else(|| {
                let names: Vec<_> = VALID_PREDICATES.iter().map(|p| p.name()).collect();
                SpatialError::Config(format!(
                    "invalid predicate '{}'; valid predicates are: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for BinaryPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Evaluate `predicate(a, b)` exactly.
///
/// Null handling happens upstream; empty geometries never satisfy any
/// predicate. `distance` is required for `Dwithin` and rejected for every
/// other predicate.
pub fn evaluate(
    predicate: BinaryPredicate,
    a: &Geometry<f64>,
    b: &Geometry<f64>,
    distance: Option<f64>,
) -> Result<bool> {
    match (predicate.requires_distance(), distance) {
        (true, None) => {
            return Err(SpatialError::Config(
                "'dwithin' predicate requires a distance argument".to_string(),
            ))
        }
        (false, Some(_)) => {
            return Err(SpatialError::Config(format!(
                "distance argument is only valid with 'dwithin', not '{}'",
                predicate
            )))
        }
        _ => {}
    }

    if is_geometry_empty(a) || is_geometry_empty(b) {
        return Ok(false);
    }

    Ok(match predicate {
        BinaryPredicate::Intersects => a.intersects(b),
        BinaryPredicate::Within => a.is_within(b),
        BinaryPredicate::Contains => a.contains(b),
        BinaryPredicate::ContainsProperly => {
            // DE-9IM: interior of b intersects interior of a, and b touches
            // neither a's boundary nor exterior.
            a.relate(b).matches("T**FF*FF*").unwrap_or(false)
        }
        BinaryPredicate::Covers => a.relate(b).is_covers(),
        BinaryPredicate::CoveredBy => a.relate(b).is_coveredby(),
        BinaryPredicate::Crosses => a.relate(b).is_crosses(),
        BinaryPredicate::Touches => a.relate(b).is_touches(),
        BinaryPredicate::Overlaps => a.relate(b).is_overlaps(),
        BinaryPredicate::Dwithin => {
            let d = distance.expect("validated above");
            geometry_distance(a, b) <= d
        }
    })
}
