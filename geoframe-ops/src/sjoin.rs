//! Spatial joins between two geometry-typed frames.
//!
//! Matching always evaluates `predicate(left_geometry, right_geometry)`:
//! the right frame's index is queried with the left frame's geometries, so
//! asymmetric predicates keep their user-facing direction. The join itself
//! is assembled like a relational join keyed on the matched pairs, with
//! left/inner/right variants and suffix-based disambiguation of colliding
//! attribute names.

use geoframe_spatial::{
    BinaryPredicate, Crs, Distances, MatchPairs, NearestParams,
};
use geoframe_tabular::{Column, Field, FieldType};
use rustc_hash::FxHashSet;

use crate::error::{OpsError, Result};
use crate::frame::GeoFrame;

/// Which side's rows survive the join unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinHow {
    /// Keep every left row; unmatched rows pad the right side with nulls.
    Left,
    /// Keep every right row; unmatched rows pad the left side with nulls.
    /// The result carries the right frame's geometry.
    Right,
    /// Keep matched pairs only.
    #[default]
    Inner,
}

/// Parameters for [`sjoin`].
#[derive(Debug, Clone)]
pub struct SjoinParams {
    pub how: JoinHow,
    pub predicate: BinaryPredicate,
    /// Search distance for the `dwithin` predicate; per-input values align
    /// with left rows.
    pub distance: Option<Distances>,
    pub lsuffix: String,
    pub rsuffix: String,
    /// Attribute equality constraints: a matched pair survives only when
    /// the named columns are equal (non-null) on both sides. The columns
    /// appear once in the output.
    pub on_attribute: Vec<String>,
}

impl Default for SjoinParams {
    fn default() -> Self {
        Self {
            how: JoinHow::Inner,
            predicate: BinaryPredicate::Intersects,
            distance: None,
            lsuffix: "left".to_string(),
            rsuffix: "right".to_string(),
            on_attribute: Vec::new(),
        }
    }
}

/// Parameters for [`sjoin_nearest`].
#[derive(Debug, Clone)]
pub struct SjoinNearestParams {
    pub how: JoinHow,
    /// Candidates farther than this never match. Rows left without a match
    /// by the cap are dropped even under a left or right join, making the
    /// result inner-like for those rows.
    pub max_distance: Option<f64>,
    pub lsuffix: String,
    pub rsuffix: String,
    /// When set, the result gains a float column of this name holding the
    /// matched distance.
    pub distance_col: Option<String>,
    /// Skip matches between equal geometries.
    pub exclusive: bool,
}

impl Default for SjoinNearestParams {
    fn default() -> Self {
        Self {
            how: JoinHow::Inner,
            max_distance: None,
            lsuffix: "left".to_string(),
            rsuffix: "right".to_string(),
            distance_col: None,
            exclusive: false,
        }
    }
}

/// Join two frames on a spatial predicate.
///
/// Every output row represents one `(left, right)` pair for which
/// `predicate(left_geometry, right_geometry)` holds, subject to the
/// `on_attribute` equality constraints. Output rows are ordered by the
/// surviving side's positions. Row labels come from the `how` side; the
/// other side's labels land in an `index_right` (or `index_left`) column.
pub fn sjoin(left: &GeoFrame, right: &GeoFrame, params: &SjoinParams) -> Result<GeoFrame> {
    check_reserved_index_names(left, right, &params.lsuffix, &params.rsuffix)?;
    warn_on_crs_mismatch(left.crs(), right.crs());
    validate_on_attribute(left, right, &params.on_attribute)?;

    let index = right.geometry().sindex();
    let pairs = index.query_many(
        left.geometry().slots(),
        Some(params.predicate),
        params.distance.clone(),
        true,
    )?;
    let pairs = filter_on_attribute(left, right, pairs, &params.on_attribute);
    tracing::debug!(
        predicate = params.predicate.name(),
        pairs = pairs.len(),
        "spatial join matched"
    );

    let (left_take, right_take) = expand_pairs(left.len(), right.len(), &pairs, params.how, true);
    assemble(
        left,
        right,
        &left_take,
        &right_take,
        params.how,
        &params.lsuffix,
        &params.rsuffix,
        &params.on_attribute,
        None,
    )
}

/// Join each row to its nearest counterpart in the other frame.
///
/// For left and inner joins the right frame's index answers nearest queries
/// for left geometries; for a right join the roles flip. Ties at the
/// minimum distance all match, fanning the row out.
pub fn sjoin_nearest(
    left: &GeoFrame,
    right: &GeoFrame,
    params: &SjoinNearestParams,
) -> Result<GeoFrame> {
    check_reserved_index_names(left, right, &params.lsuffix, &params.rsuffix)?;
    warn_on_crs_mismatch(left.crs(), right.crs());

    let nearest_params = NearestParams {
        return_all: true,
        max_distance: params.max_distance,
        exclusive: params.exclusive,
    };
    let (pairs, dists) = match params.how {
        JoinHow::Right => {
            // Nearest left geometry for each right row.
            let (raw, dists) = left
                .geometry()
                .sindex()
                .nearest_many(right.geometry().slots(), &nearest_params);
            // raw.input indexes right rows, raw.tree indexes left rows.
            (
                MatchPairs {
                    input: raw.tree,
                    tree: raw.input,
                },
                dists,
            )
        }
        JoinHow::Left | JoinHow::Inner => right
            .geometry()
            .sindex()
            .nearest_many(left.geometry().slots(), &nearest_params),
    };
    tracing::debug!(pairs = pairs.len(), "nearest join matched");

    // With a max_distance, rows whose nearest neighbor is out of range have
    // no pair and are dropped even under a left or right join; the outer
    // variants only pad rows that could never match (null or empty
    // geometry), and only when no distance cap is in play.
    let pad_unmatched = params.max_distance.is_none();
    let (left_take, right_take) =
        expand_pairs(left.len(), right.len(), &pairs, params.how, pad_unmatched);
    let distance_col = match &params.distance_col {
        None => None,
        Some(name) => {
            // Distances are aligned with the matched pairs; padded rows
            // introduced by the outer variants get nulls.
            let by_pair: Vec<Option<f64>> = dists.into_iter().map(Some).collect();
            Some((name.clone(), pad_distances(&left_take, &right_take, &pairs, by_pair, params.how)))
        }
    };
    assemble(
        left,
        right,
        &left_take,
        &right_take,
        params.how,
        &params.lsuffix,
        &params.rsuffix,
        &[],
        distance_col,
    )
}

fn warn_on_crs_mismatch(left: Option<&Crs>, right: Option<&Crs>) {
    if let (Some(l), Some(r)) = (left, right) {
        if l != r {
            tracing::warn!(left = %l, right = %r, "joining frames with different CRS");
        }
    }
}

fn validate_on_attribute(left: &GeoFrame, right: &GeoFrame, names: &[String]) -> Result<()> {
    for name in names {
        let l = left
            .table()
            .schema
            .field(name)
            .ok_or_else(|| OpsError::Param(format!("on_attribute column {name:?} missing from left frame")))?;
        let r = right
            .table()
            .schema
            .field(name)
            .ok_or_else(|| OpsError::Param(format!("on_attribute column {name:?} missing from right frame")))?;
        if l.field_type != r.field_type {
            return Err(OpsError::Param(format!(
                "on_attribute column {name:?} has type {:?} on the left but {:?} on the right",
                l.field_type, r.field_type
            )));
        }
    }
    Ok(())
}

fn filter_on_attribute(
    left: &GeoFrame,
    right: &GeoFrame,
    pairs: MatchPairs,
    names: &[String],
) -> MatchPairs {
    if names.is_empty() {
        return pairs;
    }
    let columns: Vec<(&Column, &Column)> = names
        .iter()
        .map(|name| {
            // Presence was validated up front.
            (
                left.table().column(name).expect("validated"),
                right.table().column(name).expect("validated"),
            )
        })
        .collect();
    let mut out = MatchPairs::default();
    for (&l, &r) in pairs.input.iter().zip(&pairs.tree) {
        if columns.iter().all(|(lc, rc)| lc.value_eq(l, rc, r)) {
            out.input.push(l);
            out.tree.push(r);
        }
    }
    out
}

/// Turn matched pairs into aligned gather vectors for both sides, adding
/// `-1` padded rows for the outer variants. Pairs arrive sorted by left
/// position; a right join re-orders by right position.
fn check_reserved_index_names(
    left: &GeoFrame,
    right: &GeoFrame,
    lsuffix: &str,
    rsuffix: &str,
) -> Result<()> {
    for name in [format!("index_{lsuffix}"), format!("index_{rsuffix}")] {
        if left.table().schema.contains(&name) || right.table().schema.contains(&name) {
            return Err(OpsError::Param(format!(
                "{name:?} cannot be a column name in the frames being joined"
            )));
        }
    }
    Ok(())
}

fn expand_pairs(
    left_len: usize,
    right_len: usize,
    pairs: &MatchPairs,
    how: JoinHow,
    pad_unmatched: bool,
) -> (Vec<i64>, Vec<i64>) {
    match how {
        JoinHow::Inner => (
            pairs.input.iter().map(|&i| i as i64).collect(),
            pairs.tree.iter().map(|&i| i as i64).collect(),
        ),
        JoinHow::Left => {
            let mut left_take = Vec::with_capacity(left_len.max(pairs.len()));
            let mut right_take = Vec::with_capacity(left_len.max(pairs.len()));
            let mut cursor = 0;
            for row in 0..left_len {
                let mut matched = false;
                while cursor < pairs.len() && pairs.input[cursor] == row {
                    left_take.push(row as i64);
                    right_take.push(pairs.tree[cursor] as i64);
                    cursor += 1;
                    matched = true;
                }
                if !matched && pad_unmatched {
                    left_take.push(row as i64);
                    right_take.push(-1);
                }
            }
            (left_take, right_take)
        }
        JoinHow::Right => {
            let mut ordered: Vec<(usize, usize)> = pairs
                .tree
                .iter()
                .zip(&pairs.input)
                .map(|(&r, &l)| (r, l))
                .collect();
            ordered.sort_unstable();
            let mut left_take = Vec::with_capacity(right_len.max(pairs.len()));
            let mut right_take = Vec::with_capacity(right_len.max(pairs.len()));
            let mut cursor = 0;
            for row in 0..right_len {
                let mut matched = false;
                while cursor < ordered.len() && ordered[cursor].0 == row {
                    right_take.push(row as i64);
                    left_take.push(ordered[cursor].1 as i64);
                    cursor += 1;
                    matched = true;
                }
                if !matched && pad_unmatched {
                    right_take.push(row as i64);
                    left_take.push(-1);
                }
            }
            (left_take, right_take)
        }
    }
}

/// Align per-pair distances with the expanded gather vectors.
fn pad_distances(
    left_take: &[i64],
    right_take: &[i64],
    pairs: &MatchPairs,
    by_pair: Vec<Option<f64>>,
    how: JoinHow,
) -> Vec<Option<f64>> {
    match how {
        JoinHow::Inner => by_pair,
        JoinHow::Left => {
            // Padded rows are exactly those with a -1 on the right side;
            // matched rows keep the original pair order.
            let mut iter = by_pair.into_iter();
            right_take
                .iter()
                .map(|&r| if r < 0 { None } else { iter.next().flatten() })
                .collect()
        }
        JoinHow::Right => {
            // Pairs were re-ordered by right position; rebuild the lookup.
            let mut ordered: Vec<((usize, usize), Option<f64>)> = pairs
                .tree
                .iter()
                .zip(&pairs.input)
                .map(|(&r, &l)| (r, l))
                .zip(by_pair)
                .collect();
            ordered.sort_unstable_by_key(|&(key, _)| key);
            let mut iter = ordered.into_iter().map(|(_, d)| d);
            left_take
                .iter()
                .map(|&l| if l < 0 { None } else { iter.next().flatten() })
                .collect()
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    left: &GeoFrame,
    right: &GeoFrame,
    left_take: &[i64],
    right_take: &[i64],
    how: JoinHow,
    lsuffix: &str,
    rsuffix: &str,
    on_attribute: &[String],
    distance_col: Option<(String, Vec<Option<f64>>)>,
) -> Result<GeoFrame> {
    let shared: FxHashSet<&str> = left
        .table()
        .schema
        .names()
        .filter(|n| right.table().schema.contains(n) && !on_attribute.iter().any(|a| a == n))
        .collect();

    let mut left_renames = std::collections::HashMap::new();
    let mut right_renames = std::collections::HashMap::new();
    for &name in &shared {
        left_renames.insert(name.to_string(), format!("{name}_{lsuffix}"));
        right_renames.insert(name.to_string(), format!("{name}_{rsuffix}"));
    }

    let (geometry_column, index_col_name) = match how {
        JoinHow::Right => (right.geometry_column().to_string(), "index_left"),
        JoinHow::Left | JoinHow::Inner => (left.geometry_column().to_string(), "index_right"),
    };

    // Fail fast on any name that would still collide after suffixing.
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut collisions: Vec<String> = Vec::new();
    let claim = |name: String, seen: &mut FxHashSet<String>, collisions: &mut Vec<String>| {
        if !seen.insert(name.clone()) {
            collisions.push(name);
        }
    };
    for name in left.table().schema.names() {
        let final_name = left_renames.get(name).cloned().unwrap_or_else(|| name.to_string());
        claim(final_name, &mut seen, &mut collisions);
    }
    for name in right.table().schema.names() {
        if on_attribute.iter().any(|a| a == name) {
            continue;
        }
        let final_name = right_renames.get(name).cloned().unwrap_or_else(|| name.to_string());
        claim(final_name, &mut seen, &mut collisions);
    }
    claim(index_col_name.to_string(), &mut seen, &mut collisions);
    claim(geometry_column.clone(), &mut seen, &mut collisions);
    if let Some((name, _)) = &distance_col {
        claim(name.clone(), &mut seen, &mut collisions);
    }
    if !collisions.is_empty() {
        collisions.sort();
        collisions.dedup();
        return Err(OpsError::ColumnCollision(collisions));
    }

    let left_part = left
        .table()
        .rename_columns(&left_renames)?
        .take_padded(left_take);
    let right_names: Vec<&str> = right
        .table()
        .schema
        .names()
        .filter(|n| !on_attribute.iter().any(|a| a == n))
        .collect();
    let right_part = right
        .table()
        .project(&right_names)?
        .rename_columns(&right_renames)?
        .take_padded(right_take);
    let mut table = left_part.hstack(&right_part)?;

    // The merged key columns come from the left side, so a padded row under
    // an outer variant would show null even when its retained row has a
    // value. Backfill those rows from the right side.
    if how != JoinHow::Inner {
        for name in on_attribute {
            let merged = table.column(name).expect("validated").coalesce(
                &right
                    .table()
                    .column(name)
                    .expect("validated")
                    .take_padded(right_take),
            )?;
            table = table.replace_column(name, merged)?;
        }
    }

    // Labels from the surviving side; the other side's labels become a
    // regular attribute column.
    let (labels, other_labels): (Vec<i64>, Vec<Option<i64>>) = match how {
        JoinHow::Right => (
            right_take.iter().map(|&i| right.labels()[i as usize]).collect(),
            left_take
                .iter()
                .map(|&i| (i >= 0).then(|| left.labels()[i as usize]))
                .collect(),
        ),
        JoinHow::Left | JoinHow::Inner => (
            left_take.iter().map(|&i| left.labels()[i as usize]).collect(),
            right_take
                .iter()
                .map(|&i| (i >= 0).then(|| right.labels()[i as usize]))
                .collect(),
        ),
    };
    table = table.push_column(
        Field::new(index_col_name, FieldType::Int),
        Column::Int(other_labels),
    )?;
    if let Some((name, values)) = distance_col {
        table = table.push_column(Field::new(name, FieldType::Float), Column::Float(values))?;
    }

    let geometry = match how {
        JoinHow::Right => right.geometry().take(right_take)?,
        JoinHow::Left | JoinHow::Inner => left.geometry().take(left_take)?,
    };
    GeoFrame::with_labels(table, geometry, geometry_column, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoframe_spatial::{parse_wkt, GeomArray};
    use geoframe_tabular::{Table, TableSchema};
    use geo_types::Geometry;
    use std::sync::Arc;

    fn str_frame(name_col: &str, names: &[&str], wkts: &[&str]) -> GeoFrame {
        let schema = Arc::new(TableSchema::new(vec![Field::new(name_col, FieldType::Str)]).unwrap());
        let table = Table::new(
            schema,
            vec![Column::Str(names.iter().map(|s| Some(s.to_string())).collect())],
        )
        .unwrap();
        let geoms: Vec<Option<Geometry<f64>>> =
            wkts.iter().map(|w| Some(parse_wkt(w).unwrap())).collect();
        GeoFrame::new(table, GeomArray::new(geoms, None), "geometry").unwrap()
    }

    fn points() -> GeoFrame {
        str_frame(
            "pt",
            &["a", "b", "c"],
            &["POINT(0.5 0.5)", "POINT(5 5)", "POINT(20 20)"],
        )
    }

    fn zones() -> GeoFrame {
        str_frame(
            "zone",
            &["low", "high"],
            &[
                "POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))",
                "POLYGON((4 4, 6 4, 6 6, 4 6, 4 4))",
            ],
        )
    }

    #[test]
    fn test_inner_join_matches_only() {
        let joined = sjoin(&points(), &zones(), &SjoinParams::default()).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.labels(), &[0, 1]);
        let zone = joined.table().column("zone").unwrap();
        assert_eq!(zone.get_str(0), Some("low"));
        assert_eq!(zone.get_str(1), Some("high"));
        let idx = joined.table().column("index_right").unwrap();
        assert_eq!(idx.get_int(0), Some(0));
        assert_eq!(idx.get_int(1), Some(1));
    }

    #[test]
    fn test_left_join_pads_unmatched() {
        let params = SjoinParams {
            how: JoinHow::Left,
            ..Default::default()
        };
        let joined = sjoin(&points(), &zones(), &params).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.labels(), &[0, 1, 2]);
        let zone = joined.table().column("zone").unwrap();
        assert_eq!(zone.get_str(2), None);
        assert_eq!(joined.table().column("index_right").unwrap().get_int(2), None);
        // Geometry still comes from the left frame.
        assert_eq!(joined.geometry().get(2), points().geometry().get(2));
    }

    #[test]
    fn test_right_join_uses_right_geometry() {
        let params = SjoinParams {
            how: JoinHow::Right,
            ..Default::default()
        };
        let joined = sjoin(&points(), &zones(), &params).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.labels(), &[0, 1]);
        assert_eq!(joined.geometry().get(0), zones().geometry().get(0));
        assert_eq!(joined.table().column("index_left").unwrap().get_int(1), Some(1));
    }

    #[test]
    fn test_asymmetric_predicate_direction() {
        // zones-contains-points must match, points-contains-zones must not.
        let params = SjoinParams {
            predicate: BinaryPredicate::Contains,
            ..Default::default()
        };
        let forward = sjoin(&zones(), &points(), &params).unwrap();
        assert_eq!(forward.len(), 2);
        let reverse = sjoin(&points(), &zones(), &params).unwrap();
        assert!(reverse.is_empty());
    }

    #[test]
    fn test_suffix_on_shared_columns() {
        let left = str_frame("attr", &["l"], &["POINT(0.5 0.5)"]);
        let right = str_frame(
            "attr",
            &["r"],
            &["POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))"],
        );
        let joined = sjoin(&left, &right, &SjoinParams::default()).unwrap();
        assert_eq!(joined.table().column("attr_left").unwrap().get_str(0), Some("l"));
        assert_eq!(joined.table().column("attr_right").unwrap().get_str(0), Some("r"));
        assert!(joined.table().column("attr").is_none());
    }

    #[test]
    fn test_suffix_collision_fails_fast() {
        let left = str_frame("attr", &["l"], &["POINT(0.5 0.5)"]);
        let mut right = str_frame("attr", &["r"], &["POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))"]);
        // Force a collision with the suffixed left column.
        let table = right
            .table()
            .push_column(
                Field::new("attr_left", FieldType::Str),
                Column::Str(vec![Some("x".into())]),
            )
            .unwrap();
        right = GeoFrame::new(table, right.geometry().clone(), "geometry").unwrap();
        let err = sjoin(&left, &right, &SjoinParams::default());
        assert!(matches!(err, Err(OpsError::ColumnCollision(_))));
    }

    #[test]
    fn test_on_attribute_restricts_pairs() {
        let left = str_frame("tag", &["x", "y"], &["POINT(0.5 0.5)", "POINT(1.5 1.5)"]);
        let right = str_frame(
            "tag",
            &["x"],
            &["POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))"],
        );
        let params = SjoinParams {
            on_attribute: vec!["tag".to_string()],
            ..Default::default()
        };
        let joined = sjoin(&left, &right, &params).unwrap();
        // Both points fall in the polygon but only one shares the tag.
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.labels(), &[0]);
        // The merged key column appears once, unsuffixed.
        assert_eq!(joined.table().column("tag").unwrap().get_str(0), Some("x"));

        let missing = SjoinParams {
            on_attribute: vec!["absent".to_string()],
            ..Default::default()
        };
        assert!(sjoin(&left, &right, &missing).is_err());
    }

    #[test]
    fn test_right_join_on_attribute_fills_key_from_right() {
        let left = str_frame("tag", &["x"], &["POINT(0.5 0.5)"]);
        let right = str_frame(
            "tag",
            &["x", "y"],
            &[
                "POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))",
                "POLYGON((4 4, 6 4, 6 6, 4 6, 4 4))",
            ],
        );
        let params = SjoinParams {
            how: JoinHow::Right,
            on_attribute: vec!["tag".to_string()],
            ..Default::default()
        };
        let joined = sjoin(&left, &right, &params).unwrap();
        assert_eq!(joined.len(), 2);
        let tag = joined.table().column("tag").unwrap();
        assert_eq!(tag.get_str(0), Some("x"));
        // The padded row has no left match, but its own key value survives.
        assert_eq!(tag.get_str(1), Some("y"));
        assert_eq!(joined.table().column("index_left").unwrap().get_int(1), None);
    }

    #[test]
    fn test_dwithin_join() {
        let params = SjoinParams {
            predicate: BinaryPredicate::Dwithin,
            distance: Some(Distances::Scalar(30.0)),
            ..Default::default()
        };
        let joined = sjoin(&points(), &zones(), &params).unwrap();
        // Every point is within 30 of both zones.
        assert_eq!(joined.len(), 6);

        let no_distance = SjoinParams {
            predicate: BinaryPredicate::Dwithin,
            ..Default::default()
        };
        assert!(sjoin(&points(), &zones(), &no_distance).is_err());
    }

    #[test]
    fn test_nearest_ties_fan_out() {
        let left = str_frame("pt", &["origin"], &["POINT(0 0)"]);
        let right = str_frame(
            "site",
            &["e", "n", "w"],
            &["POINT(1 0)", "POINT(0 1)", "POINT(-1 0)"],
        );
        let params = SjoinNearestParams {
            distance_col: Some("dist".to_string()),
            ..Default::default()
        };
        let joined = sjoin_nearest(&left, &right, &params).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.labels(), &[0, 0, 0]);
        let dist = joined.table().column("dist").unwrap();
        for i in 0..3 {
            assert_eq!(dist.get_float(i), Some(1.0));
        }
    }

    #[test]
    fn test_nearest_max_distance_drops_unreachable_rows() {
        let left = str_frame("pt", &["near", "far"], &["POINT(0 0)", "POINT(100 100)"]);
        let right = str_frame("site", &["s"], &["POINT(1 0)"]);
        let params = SjoinNearestParams {
            how: JoinHow::Left,
            max_distance: Some(5.0),
            distance_col: Some("dist".to_string()),
            ..Default::default()
        };
        // Out-of-range rows vanish even though a left join was requested.
        let joined = sjoin_nearest(&left, &right, &params).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.labels(), &[0]);
        assert_eq!(joined.table().column("site").unwrap().get_str(0), Some("s"));
        assert_eq!(joined.table().column("dist").unwrap().get_float(0), Some(1.0));
    }

    #[test]
    fn test_reserved_index_name_fails_before_querying() {
        let left = str_frame("index_right", &["x"], &["POINT(0 0)"]);
        let right = str_frame("site", &["s"], &["POINT(1 0)"]);
        assert!(sjoin(&left, &right, &SjoinParams::default()).is_err());
        assert!(sjoin_nearest(&left, &right, &SjoinNearestParams::default()).is_err());
    }

    #[test]
    fn test_nearest_right_join() {
        let left = str_frame("pt", &["a"], &["POINT(0 0)"]);
        let right = str_frame("site", &["s1", "s2"], &["POINT(1 0)", "POINT(2 0)"]);
        let params = SjoinNearestParams {
            how: JoinHow::Right,
            distance_col: Some("dist".to_string()),
            ..Default::default()
        };
        let joined = sjoin_nearest(&left, &right, &params).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.labels(), &[0, 1]);
        assert_eq!(joined.geometry().get(0), right.geometry().get(0));
        assert_eq!(joined.table().column("dist").unwrap().get_float(1), Some(2.0));
    }
}
