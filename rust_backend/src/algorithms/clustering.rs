//! Density-based grouping of detection points into candidate trackways.
//!
//! DBSCAN over a uniform grid index whose cell edge equals `eps`, so every
//! neighbourhood query touches at most the 3x3 block of cells around a point.
//! Points are visited in ascending insertion index and neighbourhoods are
//! expanded in ascending index order, which makes the partition reproducible.
//! Only time-agnostic spatial coordinates take part in the metric.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::core::domain::{Candidate, DetectionPoint};

/// Uniform grid over point indices.
struct GridIndex<'a> {
    points: &'a [DetectionPoint],
    cell: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl<'a> GridIndex<'a> {
    fn build(points: &'a [DetectionPoint], cell: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (idx, p) in points.iter().enumerate() {
            if p.x.is_finite() && p.y.is_finite() {
                cells.entry(Self::key(p, cell)).or_default().push(idx);
            }
        }
        Self { points, cell, cells }
    }

    fn key(p: &DetectionPoint, cell: f64) -> (i64, i64) {
        ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
    }

    /// Indices within `eps` of point `idx` (itself included), ascending.
    fn region(&self, idx: usize, eps: f64) -> Vec<usize> {
        let p = &self.points[idx];
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Vec::new();
        }
        let (cx, cy) = Self::key(p, self.cell);
        let mut found = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) {
                    found.extend(bucket.iter().copied().filter(|&j| {
                        let q = &self.points[j];
                        (p.x - q.x).hypot(p.y - q.y) <= eps
                    }));
                }
            }
        }
        found.sort_unstable();
        found
    }
}

/// Point-to-cluster partition produced by [`TrajectoryClusterer::cluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    /// Cluster label per input point, `None` for noise.
    pub labels: Vec<Option<usize>>,
    /// Member indices per cluster, ascending.
    pub clusters: BTreeMap<usize, Vec<usize>>,
    /// Indices of points that belong to no cluster.
    pub noise: Vec<usize>,
}

impl ClusterAssignment {
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }
}

/// DBSCAN clusterer with radius `eps` and minimum neighbourhood size `min_pts`.
///
/// A point is a core point when at least `min_pts` points (itself included)
/// lie within distance `eps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryClusterer {
    pub eps: f64,
    pub min_pts: usize,
}

impl Default for TrajectoryClusterer {
    fn default() -> Self {
        Self {
            eps: 50.0,
            min_pts: 5,
        }
    }
}

impl TrajectoryClusterer {
    pub fn new(eps: f64, min_pts: usize) -> Self {
        Self { eps, min_pts }
    }

    /// Partition `points` into clusters and noise.
    pub fn cluster(&self, points: &[DetectionPoint]) -> ClusterAssignment {
        let n = points.len();
        let mut labels: Vec<Option<usize>> = vec![None; n];

        if n == 0 || !(self.eps > 0.0) {
            return ClusterAssignment {
                labels,
                clusters: BTreeMap::new(),
                noise: (0..n).collect(),
            };
        }

        let index = GridIndex::build(points, self.eps);
        let mut visited = vec![false; n];
        let mut next_cluster = 0usize;

        for i in 0..n {
            if visited[i] {
                continue;
            }
            visited[i] = true;

            let neighbours = index.region(i, self.eps);
            if neighbours.len() < self.min_pts {
                continue;
            }

            let cluster_id = next_cluster;
            next_cluster += 1;
            labels[i] = Some(cluster_id);

            let mut queue: VecDeque<usize> = neighbours.into_iter().collect();
            while let Some(j) = queue.pop_front() {
                if labels[j].is_none() {
                    labels[j] = Some(cluster_id);
                }
                if visited[j] {
                    continue;
                }
                visited[j] = true;

                let expansion = index.region(j, self.eps);
                if expansion.len() >= self.min_pts {
                    queue.extend(expansion);
                }
            }
        }

        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut noise = Vec::new();
        for (idx, label) in labels.iter().enumerate() {
            match label {
                Some(cluster_id) => clusters.entry(*cluster_id).or_default().push(idx),
                None => noise.push(idx),
            }
        }

        log::debug!(
            "Clustered {} points into {} clusters ({} noise, eps={}, min_pts={})",
            n,
            clusters.len(),
            noise.len(),
            self.eps,
            self.min_pts
        );

        ClusterAssignment {
            labels,
            clusters,
            noise,
        }
    }

    /// Cluster `points` and return one time-ordered candidate per cluster.
    ///
    /// Noise points are dropped here and never reach later stages.
    pub fn cluster_points(&self, points: &[DetectionPoint]) -> (Vec<Candidate>, usize) {
        let assignment = self.cluster(points);
        let noise = assignment.noise.len();
        let candidates = assignment
            .clusters
            .into_iter()
            .map(|(cluster_id, members)| {
                Candidate::new(
                    cluster_id,
                    members.into_iter().map(|i| points[i].clone()).collect(),
                )
            })
            .collect();
        (candidates, noise)
    }
}
