//! Unsigned distance field evaluation.
//!
//! One k-d tree is built per surface cloud and queried once per query point.
//! Queries are independent, so they run on the rayon pool; `collect` keeps
//! the output in query order.

use glam::DVec3;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use pairfield_data::DistanceRecord;
use rayon::prelude::*;
use tracing::instrument;

/// Result of a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Index of the point in the slice the index was built from.
    pub index: usize,
    pub dist2: f64,
}

impl Nearest {
    pub fn distance(&self) -> f64 {
        self.dist2.sqrt()
    }
}

/// Static nearest-neighbor index over one surface cloud.
pub struct SurfaceIndex {
    // kiddo trees need at least one point
    tree: Option<ImmutableKdTree<f64, 3>>,
}

impl SurfaceIndex {
    pub fn build(points: &[DVec3]) -> Self {
        if points.is_empty() {
            return Self { tree: None };
        }
        let coords: Vec<[f64; 3]> = points.iter().map(|p| p.to_array()).collect();
        Self {
            tree: Some(ImmutableKdTree::new_from_slice(&coords)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    pub fn nearest(&self, query: DVec3) -> Option<Nearest> {
        let found = self
            .tree
            .as_ref()?
            .nearest_one::<SquaredEuclidean>(&query.to_array());
        Some(Nearest {
            index: found.item as usize,
            dist2: found.distance,
        })
    }
}

/// Distance from `query` to the closest point in `index`, infinity if the
/// index is empty.
pub fn nearest_distance(index: &SurfaceIndex, query: DVec3) -> f64 {
    index
        .nearest(query)
        .map(|n| n.distance())
        .unwrap_or(f64::INFINITY)
}

/// Label every query point with its distances to `surface1` and `surface2`.
///
/// All inputs must already be in the same normalized frame.
#[instrument(skip_all, fields(queries = queries.len(), s1 = surface1.len(), s2 = surface2.len()))]
pub fn evaluate_distance_field(
    queries: &[DVec3],
    surface1: &[DVec3],
    surface2: &[DVec3],
) -> Vec<DistanceRecord> {
    let (index1, index2) = rayon::join(
        || SurfaceIndex::build(surface1),
        || SurfaceIndex::build(surface2),
    );
    queries
        .par_iter()
        .map(|&q| DistanceRecord::new(q, nearest_distance(&index1, q), nearest_distance(&index2, q)))
        .collect()
}
