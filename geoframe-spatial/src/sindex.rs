//! Bounding-box tree index over a geometry column.
//!
//! The index wraps one immutable snapshot of a column's geometries. Empty
//! geometries are replaced by placeholders at construction so that index
//! positions stay aligned with the original column while empties can never
//! match a query. Queries run a bbox prefilter through the R-tree, then an
//! exact predicate refinement; nearest-neighbor queries run a best-first
//! branch-and-bound over the tree using bbox distance as the lower bound.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geo_types::Geometry;
use rstar::{ParentNode, RTree, RTreeNode, RTreeObject, AABB};

use crate::distance::geometry_distance;
use crate::error::{Result, SpatialError};
use crate::geometry::{is_geometry_empty, BBox};
use crate::predicate::{evaluate, BinaryPredicate, VALID_PREDICATES};

/// One indexed geometry: its position in the source column and its envelope.
#[derive(Debug, Clone)]
struct TreeEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for TreeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Distance arguments for `dwithin` queries: one value for all inputs, or
/// one value per input geometry.
#[derive(Debug, Clone)]
pub enum Distances {
    Scalar(f64),
    PerInput(Vec<f64>),
}

impl Distances {
    fn get(&self, input_idx: usize) -> f64 {
        match self {
            Self::Scalar(d) => *d,
            Self::PerInput(v) => v[input_idx],
        }
    }
}

/// Index pairs produced by a batched query: `(input[j], tree[j])` is one
/// match. A single input index may recur for multiple tree matches and
/// vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPairs {
    pub input: Vec<usize>,
    pub tree: Vec<usize>,
}

impl MatchPairs {
    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Whether no pair matched.
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn push(&mut self, input: usize, tree: usize) {
        self.input.push(input);
        self.tree.push(tree);
    }
}

/// Parameters for nearest-neighbor queries.
#[derive(Debug, Clone)]
pub struct NearestParams {
    /// Return every tree geometry tied at the minimum distance. When false,
    /// the tied candidate with the lowest tree index wins; this deliberate
    /// deterministic tie-break makes results reproducible.
    pub return_all: bool,
    /// Candidates farther than this are excluded; inputs with no candidate
    /// in range produce no match at all.
    pub max_distance: Option<f64>,
    /// Skip tree geometries that are equal to the input geometry.
    pub exclusive: bool,
}

impl Default for NearestParams {
    fn default() -> Self {
        Self {
            return_all: true,
            max_distance: None,
            exclusive: false,
        }
    }
}

/// Spatial index over one snapshot of a geometry column.
#[derive(Debug)]
pub struct SpatialIndex {
    /// Snapshot of the column, with empty geometries replaced by `None`.
    geoms: Vec<Option<Geometry<f64>>>,
    tree: RTree<TreeEntry>,
}

impl SpatialIndex {
    /// Build an index from a column's backing slots.
    pub fn new(slots: &[Option<Geometry<f64>>]) -> Self {
        let geoms: Vec<Option<Geometry<f64>>> = slots
            .iter()
            .map(|s| {
                s.as_ref()
                    .filter(|g| !is_geometry_empty(g))
                    .cloned()
            })
            .collect();
        let entries: Vec<TreeEntry> = geoms
            .iter()
            .enumerate()
            .filter_map(|(index, g)| {
                let bbox = g.as_ref().and_then(BBox::from_geometry)?;
                Some(TreeEntry {
                    index,
                    envelope: AABB::from_corners(
                        [bbox.min_x, bbox.min_y],
                        [bbox.max_x, bbox.max_y],
                    ),
                })
            })
            .collect();
        let tree = RTree::bulk_load(entries);
        tracing::debug!(
            size = geoms.len(),
            indexed = tree.size(),
            "built spatial index"
        );
        Self { geoms, tree }
    }

    /// Number of elements at construction time, including placeholders for
    /// null/empty entries.
    pub fn size(&self) -> usize {
        self.geoms.len()
    }

    /// The predicate registry this index accepts. Callers validate requested
    /// predicates against this set before querying.
    pub fn valid_query_predicates(&self) -> &'static [BinaryPredicate] {
        VALID_PREDICATES
    }

    fn validate_distance(
        predicate: Option<BinaryPredicate>,
        distance: &Option<Distances>,
        num_inputs: usize,
    ) -> Result<()> {
        match (predicate, distance) {
            (Some(BinaryPredicate::Dwithin), None) => Err(SpatialError::Config(
                "'dwithin' predicate requires a distance argument".to_string(),
            )),
            (Some(BinaryPredicate::Dwithin), Some(Distances::PerInput(v)))
                if v.len() != num_inputs =>
            {
                Err(SpatialError::Config(format!(
                    "got {} distances for {} input geometries",
                    v.len(),
                    num_inputs
                )))
            }
            (_, Some(_)) if predicate != Some(BinaryPredicate::Dwithin) => {
                Err(SpatialError::Config(
                    "distance argument is only valid with the 'dwithin' predicate".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Tree indices whose bounding box intersects `bbox`, in tree order.
    fn bbox_candidates(&self, bbox: &BBox) -> impl Iterator<Item = usize> + '_ {
        let aabb = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|e| e.index)
    }

    fn query_one(
        &self,
        geom: &Geometry<f64>,
        predicate: Option<BinaryPredicate>,
        distance: Option<f64>,
    ) -> Result<Vec<usize>> {
        if is_geometry_empty(geom) {
            return Ok(Vec::new());
        }
        let Some(bbox) = BBox::from_geometry(geom) else {
            return Ok(Vec::new());
        };
        // dwithin candidates live within the input bbox grown by the distance.
        let search = match (predicate, distance) {
            (Some(BinaryPredicate::Dwithin), Some(d)) => bbox.expand(d),
            _ => bbox,
        };

        let mut hits = Vec::new();
        for tree_idx in self.bbox_candidates(&search) {
            let tree_geom = self.geoms[tree_idx]
                .as_ref()
                .expect("tree entries only exist for present geometries");
            let keep = match predicate {
                None => true,
                Some(pred) => evaluate(pred, geom, tree_geom, distance)?,
            };
            if keep {
                hits.push(tree_idx);
            }
        }
        hits.sort_unstable();
        Ok(hits)
    }

    /// Query with a single input geometry, returning matching tree indices
    /// in ascending order.
    ///
    /// With no predicate, matches are the bbox intersections alone. With a
    /// predicate, bbox candidates are refined by exact evaluation of
    /// `predicate(input, tree_geometry)`.
    pub fn query(
        &self,
        geom: &Geometry<f64>,
        predicate: Option<BinaryPredicate>,
        distance: Option<f64>,
    ) -> Result<Vec<usize>> {
        Self::validate_distance(predicate, &distance.map(Distances::Scalar), 1)?;
        self.query_one(geom, predicate, distance)
    }

    /// Query with a batch of input geometries.
    ///
    /// Null and empty inputs never match. With `sort`, pairs are ordered by
    /// input index then tree index; otherwise the order is unspecified.
    pub fn query_many(
        &self,
        inputs: &[Option<Geometry<f64>>],
        predicate: Option<BinaryPredicate>,
        distance: Option<Distances>,
        sort: bool,
    ) -> Result<MatchPairs> {
        Self::validate_distance(predicate, &distance, inputs.len())?;

        let mut pairs = MatchPairs::default();
        for (input_idx, slot) in inputs.iter().enumerate() {
            let Some(geom) = slot else { continue };
            let d = distance.as_ref().map(|d| d.get(input_idx));
            for tree_idx in self.query_one(geom, predicate, d)? {
                pairs.push(input_idx, tree_idx);
            }
        }
        // query_one returns ascending tree indices and inputs are visited in
        // order, so the pairs are already (input, tree) sorted.
        let _ = sort;
        Ok(pairs)
    }

    /// Nearest tree geometries for a single input geometry, as
    /// `(tree_index, distance)` pairs sorted by tree index.
    pub fn nearest(
        &self,
        geom: &Geometry<f64>,
        params: &NearestParams,
    ) -> Vec<(usize, f64)> {
        if is_geometry_empty(geom) {
            return Vec::new();
        }
        let Some(bbox) = BBox::from_geometry(geom) else {
            return Vec::new();
        };
        let query_env = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);

        let mut heap: BinaryHeap<HeapItem<'_>> = BinaryHeap::new();
        heap.push(HeapItem {
            bound: 0.0,
            node: NodeRef::Parent(self.tree.root()),
        });

        // Everything at exactly the minimum distance is a tie; pruning is
        // strict so equal bounds are still expanded.
        let mut cutoff = params.max_distance.unwrap_or(f64::INFINITY);
        let mut best: Vec<(usize, f64)> = Vec::new();

        while let Some(item) = heap.pop() {
            if item.bound > cutoff {
                break;
            }
            match item.node {
                NodeRef::Parent(parent) => {
                    for child in parent.children() {
                        let (bound, node) = match child {
                            RTreeNode::Leaf(entry) => (
                                envelope_distance(&query_env, &entry.envelope),
                                NodeRef::Entry(entry),
                            ),
                            RTreeNode::Parent(p) => (
                                envelope_distance(&query_env, &p.envelope()),
                                NodeRef::Parent(p),
                            ),
                        };
                        if bound <= cutoff {
                            heap.push(HeapItem { bound, node });
                        }
                    }
                }
                NodeRef::Entry(entry) => {
                    let tree_geom = self.geoms[entry.index]
                        .as_ref()
                        .expect("tree entries only exist for present geometries");
                    if params.exclusive && tree_geom == geom {
                        continue;
                    }
                    let exact = geometry_distance(geom, tree_geom);
                    if exact > cutoff {
                        continue;
                    }
                    match best.first() {
                        Some(&(_, current)) if exact < current => {
                            best.clear();
                            best.push((entry.index, exact));
                            cutoff = exact;
                        }
                        Some(&(_, current)) if exact == current => {
                            best.push((entry.index, exact));
                        }
                        Some(_) => {}
                        None => {
                            best.push((entry.index, exact));
                            cutoff = exact;
                        }
                    }
                }
            }
        }

        best.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        if !params.return_all && best.len() > 1 {
            best.truncate(1);
        }
        best
    }

    /// Nearest-neighbor query over a batch of input geometries.
    ///
    /// Returns matched pairs plus the per-pair distances. Inputs that are
    /// null, empty, or (under `max_distance`) unreachable produce no pairs.
    pub fn nearest_many(
        &self,
        inputs: &[Option<Geometry<f64>>],
        params: &NearestParams,
    ) -> (MatchPairs, Vec<f64>) {
        let mut pairs = MatchPairs::default();
        let mut distances = Vec::new();
        for (input_idx, slot) in inputs.iter().enumerate() {
            let Some(geom) = slot else { continue };
            for (tree_idx, d) in self.nearest(geom, params) {
                pairs.push(input_idx, tree_idx);
                distances.push(d);
            }
        }
        (pairs, distances)
    }
}

/// Minimum distance between two axis-aligned envelopes.
fn envelope_distance(a: &AABB<[f64; 2]>, b: &AABB<[f64; 2]>) -> f64 {
    let dx = (a.lower()[0] - b.upper()[0]).max(b.lower()[0] - a.upper()[0]).max(0.0);
    let dy = (a.lower()[1] - b.upper()[1]).max(b.lower()[1] - a.upper()[1]).max(0.0);
    (dx * dx + dy * dy).sqrt()
}

enum NodeRef<'a> {
    Parent(&'a ParentNode<TreeEntry>),
    Entry(&'a TreeEntry),
}

struct HeapItem<'a> {
    bound: f64,
    node: NodeRef<'a>,
}

impl PartialEq for HeapItem<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound
    }
}

impl Eq for HeapItem<'_> {}

impl PartialOrd for HeapItem<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest bound.
        other.bound.total_cmp(&self.bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::parse_wkt;
    use geo_types::Point;

    fn point(x: f64, y: f64) -> Option<Geometry<f64>> {
        Some(Point::new(x, y).into())
    }

    fn rect(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Geometry<f64> {
        parse_wkt(&format!(
            "POLYGON(({minx} {miny}, {maxx} {miny}, {maxx} {maxy}, {minx} {maxy}, {minx} {miny}))"
        ))
        .unwrap()
    }

    #[test]
    fn test_box_query_scenarios() {
        let index = SpatialIndex::new(&[point(0.0, 0.0), point(5.0, 5.0)]);
        assert_eq!(
            index.query(&rect(-1.0, -1.0, 1.0, 1.0), None, None).unwrap(),
            vec![0]
        );
        assert_eq!(
            index
                .query(&rect(-10.0, -10.0, 10.0, 10.0), None, None)
                .unwrap(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_size_counts_placeholders() {
        let slots = vec![
            point(0.0, 0.0),
            None,
            Some(parse_wkt("POLYGON EMPTY").unwrap()),
            point(2.0, 2.0),
        ];
        let index = SpatialIndex::new(&slots);
        assert_eq!(index.size(), 4);
        // Neither the null nor the empty entry can ever match.
        let hits = index
            .query(&rect(-10.0, -10.0, 10.0, 10.0), None, None)
            .unwrap();
        assert_eq!(hits, vec![0, 3]);
    }

    #[test]
    fn test_predicate_is_subset_of_bbox_query() {
        // C-shaped candidate set: bbox hits that the exact predicate rejects.
        let slots = vec![
            Some(rect(0.0, 0.0, 1.0, 1.0)),
            Some(rect(10.0, 10.0, 11.0, 11.0)),
            Some(parse_wkt("LINESTRING(0 5, 10 5)").unwrap()),
        ];
        let index = SpatialIndex::new(&slots);
        let probe = rect(0.5, 4.0, 0.6, 6.0);
        let bbox_only = index.query(&probe, None, None).unwrap();
        let exact = index
            .query(&probe, Some(BinaryPredicate::Intersects), None)
            .unwrap();
        for idx in &exact {
            assert!(bbox_only.contains(idx));
        }
        assert_eq!(exact, vec![2]);
    }

    #[test]
    fn test_query_many_pairs() {
        let index = SpatialIndex::new(&[point(0.0, 0.0), point(5.0, 5.0)]);
        let inputs = vec![
            Some(rect(-1.0, -1.0, 6.0, 6.0)),
            None,
            Some(rect(4.0, 4.0, 6.0, 6.0)),
        ];
        let pairs = index
            .query_many(&inputs, Some(BinaryPredicate::Intersects), None, true)
            .unwrap();
        assert_eq!(pairs.input, vec![0, 0, 2]);
        assert_eq!(pairs.tree, vec![0, 1, 1]);
    }

    #[test]
    fn test_dwithin_requires_distance() {
        let index = SpatialIndex::new(&[point(0.0, 0.0)]);
        let probe: Geometry<f64> = Point::new(1.0, 0.0).into();
        assert!(index
            .query(&probe, Some(BinaryPredicate::Dwithin), None)
            .is_err());
        assert_eq!(
            index
                .query(&probe, Some(BinaryPredicate::Dwithin), Some(1.5))
                .unwrap(),
            vec![0]
        );
        assert!(index
            .query(&probe, Some(BinaryPredicate::Dwithin), Some(0.5))
            .unwrap()
            .is_empty());
        // Distance without dwithin is rejected up front.
        assert!(index
            .query(&probe, Some(BinaryPredicate::Intersects), Some(1.0))
            .is_err());
    }

    #[test]
    fn test_nearest_ties_returned() {
        // Three tree points equidistant from the origin.
        let index = SpatialIndex::new(&[
            point(1.0, 0.0),
            point(0.0, 1.0),
            point(-1.0, 0.0),
            point(10.0, 10.0),
        ]);
        let probe: Geometry<f64> = Point::new(0.0, 0.0).into();
        let all = index.nearest(&probe, &NearestParams::default());
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|&(_, d)| d == 1.0));
        assert_eq!(all.iter().map(|&(i, _)| i).collect::<Vec<_>>(), vec![0, 1, 2]);

        let one = index.nearest(
            &probe,
            &NearestParams {
                return_all: false,
                ..Default::default()
            },
        );
        assert_eq!(one, vec![(0, 1.0)]);
    }

    #[test]
    fn test_nearest_max_distance_and_exclusive() {
        let index = SpatialIndex::new(&[point(0.0, 0.0), point(5.0, 0.0)]);
        let probe: Geometry<f64> = Point::new(0.0, 0.0).into();

        let unreachable = index.nearest(
            &Geometry::from(Point::new(100.0, 100.0)),
            &NearestParams {
                max_distance: Some(1.0),
                ..Default::default()
            },
        );
        assert!(unreachable.is_empty());

        // Without exclusive the identical geometry is its own nearest.
        let inclusive = index.nearest(&probe, &NearestParams::default());
        assert_eq!(inclusive, vec![(0, 0.0)]);

        let exclusive = index.nearest(
            &probe,
            &NearestParams {
                exclusive: true,
                ..Default::default()
            },
        );
        assert_eq!(exclusive, vec![(1, 5.0)]);
    }

    #[test]
    fn test_nearest_many_skips_nulls() {
        let index = SpatialIndex::new(&[point(0.0, 0.0), point(5.0, 0.0)]);
        let inputs = vec![point(1.0, 0.0), None, point(4.0, 0.0)];
        let (pairs, distances) = index.nearest_many(&inputs, &NearestParams::default());
        assert_eq!(pairs.input, vec![0, 2]);
        assert_eq!(pairs.tree, vec![0, 1]);
        assert_eq!(distances, vec![1.0, 1.0]);
    }
}
