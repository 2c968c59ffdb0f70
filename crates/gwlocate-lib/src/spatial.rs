//! Static k-d tree over ECEF points.
//!
//! The index is bulk-built once from a slice of [`SpatialPoint`]s and never
//! modified afterwards. Items are identified by their position in the input
//! slice, so callers keep their own payloads in a parallel `Vec` and use the
//! returned item ids to look them up.
//!
//! # Layout
//!
//! The tree is implicit: `order` holds item ids arranged so that every subtree
//! occupies a contiguous range whose middle element is the splitting node.
//! Splitting axes cycle x → y → z by depth. Construction partitions each range
//! around its median with `select_nth_unstable_by`, giving O(n log n) expected
//! build time and a balanced tree. The partition order depends only on the
//! input, so identical inputs produce identical trees.
//!
//! # Metric
//!
//! Ranking uses squared Euclidean distance. All points lie on the same
//! ellipsoid surface and only relative order matters, so the square root is
//! never taken. Items at equal distance are ordered by ascending item id.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::geodesy::SpatialPoint;

const DIMENSIONS: usize = 3;

/// One result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    /// Position of the point in the slice passed to [`SpatialIndex::build`].
    pub item: usize,
    /// Squared Euclidean distance to the query point.
    pub distance_squared: f64,
}

/// Heap entry ordered by (distance, item) so the worst candidate is on top.
#[derive(Debug, Clone, Copy)]
struct Candidate(Neighbour);

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .distance_squared
            .total_cmp(&other.0.distance_squared)
            .then_with(|| self.0.item.cmp(&other.0.item))
    }
}

/// Immutable, balanced 3-D k-d tree.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    points: Vec<SpatialPoint>,
    order: Vec<usize>,
}

impl SpatialIndex {
    /// Bulk-build an index over `points`.
    pub fn build(points: &[SpatialPoint]) -> Self {
        let points = points.to_vec();
        let mut order: Vec<usize> = (0..points.len()).collect();
        partition(&points, &mut order, 0);

        debug!(points = points.len(), "built spatial index");

        Self { points, order }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point stored under `item`, if any.
    pub fn point(&self, item: usize) -> Option<&SpatialPoint> {
        self.points.get(item)
    }

    /// Return up to `k` items ordered by non-decreasing squared distance to
    /// `query`. Passing `k >= len()` ranks every indexed point.
    pub fn k_nearest(&self, query: &SpatialPoint, k: usize) -> Vec<Neighbour> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }

        let k = k.min(self.points.len());
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search(query, k, 0, self.order.len(), 0, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|Candidate(n)| n)
            .collect()
    }

    fn search(
        &self,
        query: &SpatialPoint,
        k: usize,
        lo: usize,
        hi: usize,
        depth: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        if lo >= hi {
            return;
        }

        let mid = lo + (hi - lo) / 2;
        let item = self.order[mid];
        let node = &self.points[item];

        offer(
            heap,
            k,
            Candidate(Neighbour {
                item,
                distance_squared: query.distance_squared(node),
            }),
        );

        let axis = depth % DIMENSIONS;
        let delta = query.axis(axis) - node.axis(axis);
        let (near, far) = if delta < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(query, k, near.0, near.1, depth + 1, heap);

        // Equal-distance points across the plane still compete on item id.
        let must_visit_far = heap.len() < k
            || heap
                .peek()
                .is_some_and(|worst| delta * delta <= worst.0.distance_squared);
        if must_visit_far {
            self.search(query, k, far.0, far.1, depth + 1, heap);
        }
    }
}

fn offer(heap: &mut BinaryHeap<Candidate>, k: usize, candidate: Candidate) {
    if heap.len() < k {
        heap.push(candidate);
    } else if heap.peek().is_some_and(|worst| candidate < *worst) {
        heap.pop();
        heap.push(candidate);
    }
}

fn partition(points: &[SpatialPoint], order: &mut [usize], depth: usize) {
    if order.len() <= 1 {
        return;
    }

    let axis = depth % DIMENSIONS;
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |a, b| {
        points[*a]
            .axis(axis)
            .total_cmp(&points[*b].axis(axis))
            .then_with(|| a.cmp(b))
    });

    let (left, rest) = order.split_at_mut(mid);
    partition(points, left, depth + 1);
    partition(points, &mut rest[1..], depth + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(seed: u64, count: usize) -> Vec<SpatialPoint> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                SpatialPoint::new(
                    rng.gen_range(-1000.0..1000.0),
                    rng.gen_range(-1000.0..1000.0),
                    rng.gen_range(-1000.0..1000.0),
                )
            })
            .collect()
    }

    fn brute_force(points: &[SpatialPoint], query: &SpatialPoint, k: usize) -> Vec<usize> {
        let mut all: Vec<(f64, usize)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (query.distance_squared(p), i))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        all.into_iter().take(k).map(|(_, i)| i).collect()
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = SpatialIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index
            .k_nearest(&SpatialPoint::new(0.0, 0.0, 0.0), 5)
            .is_empty());
    }

    #[test]
    fn zero_k_returns_nothing() {
        let index = SpatialIndex::build(&random_points(1, 10));
        assert!(index
            .k_nearest(&SpatialPoint::new(0.0, 0.0, 0.0), 0)
            .is_empty());
    }

    #[test]
    fn single_point_is_always_nearest() {
        let point = SpatialPoint::new(1.0, 2.0, 3.0);
        let index = SpatialIndex::build(&[point]);
        let result = index.k_nearest(&SpatialPoint::new(100.0, 100.0, 100.0), 3);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].item, 0);
    }

    #[test]
    fn matches_brute_force_for_full_ranking() {
        let points = random_points(7, 257);
        let index = SpatialIndex::build(&points);
        for query in random_points(8, 20) {
            let got: Vec<usize> = index
                .k_nearest(&query, points.len())
                .iter()
                .map(|n| n.item)
                .collect();
            assert_eq!(got, brute_force(&points, &query, points.len()));
        }
    }

    #[test]
    fn matches_brute_force_for_partial_k() {
        let points = random_points(11, 100);
        let index = SpatialIndex::build(&points);
        for query in random_points(12, 20) {
            let got: Vec<usize> = index.k_nearest(&query, 7).iter().map(|n| n.item).collect();
            assert_eq!(got, brute_force(&points, &query, 7));
        }
    }

    #[test]
    fn k_larger_than_len_is_clamped() {
        let points = random_points(3, 5);
        let index = SpatialIndex::build(&points);
        assert_eq!(index.k_nearest(&points[0], 50).len(), 5);
    }

    #[test]
    fn distances_are_non_decreasing() {
        let points = random_points(21, 64);
        let index = SpatialIndex::build(&points);
        let result = index.k_nearest(&SpatialPoint::new(5.0, -5.0, 0.0), 64);
        for pair in result.windows(2) {
            assert!(pair[0].distance_squared <= pair[1].distance_squared);
        }
    }

    #[test]
    fn equidistant_points_ordered_by_item() {
        let points = vec![
            SpatialPoint::new(0.0, 0.0, 1.0),
            SpatialPoint::new(1.0, 0.0, 0.0),
            SpatialPoint::new(0.0, 1.0, 0.0),
            SpatialPoint::new(-1.0, 0.0, 0.0),
            SpatialPoint::new(0.0, -1.0, 0.0),
        ];
        let index = SpatialIndex::build(&points);
        let items: Vec<usize> = index
            .k_nearest(&SpatialPoint::new(0.0, 0.0, 0.0), 5)
            .iter()
            .map(|n| n.item)
            .collect();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn build_is_deterministic() {
        let points = random_points(5, 50);
        let a = SpatialIndex::build(&points);
        let b = SpatialIndex::build(&points);
        assert_eq!(a.order, b.order);
    }
}
