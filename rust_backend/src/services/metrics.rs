//! Per-trackway metrics.
//!
//! Everything here degrades instead of failing: a statistic that cannot be
//! formed for one trackway becomes `None` and the rest of the analysis goes on.

use std::collections::BTreeSet;

use crate::algorithms::stats::{mean, normal_cdf, population_std};
use crate::core::domain::{Autocorrelation, Candidate, MovementBehavior, Trackway, TrackwayId};
use crate::core::geometry::{Point2, Polyline};

/// Neighbours per point in the Moran's I weights.
pub const MORAN_NEIGHBOURS: usize = 4;

/// Build a trackway from an accepted candidate.
///
/// `habitat_type` is left empty; the habitat lookup fills it when a raster is
/// available.
pub fn compute_metrics(
    id: TrackwayId,
    candidate: &Candidate,
    behavior: Option<MovementBehavior>,
    linear_features: &[Polyline],
) -> Trackway {
    let speeds = candidate.point_speeds();
    let confidences: Vec<f64> = candidate.points.iter().map(|p| p.confidence).collect();
    let positions: Vec<Point2> = candidate.points.iter().map(|p| p.position()).collect();

    let spatial_autocorrelation = morans_i(&positions, &speeds);
    if spatial_autocorrelation.value.is_none() {
        log::debug!(
            "Spatial autocorrelation unavailable for trackway {} ({} points)",
            id,
            positions.len()
        );
    }

    Trackway {
        id,
        points: candidate.points.clone(),
        length: candidate.path_length(),
        average_speed: mean(&speeds).unwrap_or(0.0),
        confidence_mean: mean(&confidences).unwrap_or(0.0),
        confidence_std: population_std(&confidences).unwrap_or(0.0),
        spatial_autocorrelation,
        habitat_type: None,
        behavior,
        edge_distance: edge_distance(&positions, linear_features),
    }
}

/// Mean distance from each point to its nearest linear feature.
pub fn edge_distance(points: &[Point2], features: &[Polyline]) -> Option<f64> {
    let features: Vec<&Polyline> = features.iter().filter(|f| !f.is_empty()).collect();
    if features.is_empty() || points.is_empty() {
        return None;
    }
    let distances: Vec<f64> = points
        .iter()
        .map(|p| {
            features
                .iter()
                .map(|f| f.distance_to_point(p))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    mean(&distances)
}

/// Sparse kNN contiguity: each point linked to its `k` nearest others,
/// symmetrised by union.
///
/// Edges are stored once as `(low, high)`. Ties in distance are broken by index.
#[derive(Debug, Clone)]
struct KnnGraph {
    edges: BTreeSet<(usize, usize)>,
    degree: Vec<usize>,
}

impl KnnGraph {
    fn build(positions: &[Point2], k: usize) -> Self {
        let n = positions.len();
        let mut edges = BTreeSet::new();
        let mut others: Vec<(f64, usize)> = Vec::with_capacity(n);

        for (i, p) in positions.iter().enumerate() {
            others.clear();
            others.extend(
                positions
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(j, q)| (p.distance(q), j)),
            );
            let take = k.min(others.len());
            if take == 0 {
                continue;
            }
            others.select_nth_unstable_by(take - 1, |a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for &(_, j) in &others[..take] {
                edges.insert((i.min(j), i.max(j)));
            }
        }

        let mut degree = vec![0; n];
        for &(i, j) in &edges {
            degree[i] += 1;
            degree[j] += 1;
        }
        Self { edges, degree }
    }

    /// Row-standardised weight of every link leaving `from`.
    fn weight(&self, from: usize) -> f64 {
        1.0 / self.degree[from].max(1) as f64
    }
}

/// Moran's I of `values` over kNN weights built from `positions`.
///
/// The p-value is two-sided under the normal approximation with the
/// randomisation assumption. Both fields are `None` with fewer than four
/// points, constant or non-finite values, or an empty weight structure.
pub fn morans_i(positions: &[Point2], values: &[f64]) -> Autocorrelation {
    let n = positions.len();
    if n < 4 || values.len() != n || values.iter().any(|v| !v.is_finite()) {
        return Autocorrelation::unavailable();
    }

    let Some(m) = mean(values) else {
        return Autocorrelation::unavailable();
    };
    let z: Vec<f64> = values.iter().map(|v| v - m).collect();
    let m2: f64 = z.iter().map(|d| d * d).sum();
    if m2 <= f64::EPSILON * n as f64 * m.abs().max(1.0) {
        return Autocorrelation::unavailable();
    }

    let graph = KnnGraph::build(positions, MORAN_NEIGHBOURS.min(n - 1));
    // Every point with a neighbour contributes a row summing to 1.
    let s0 = graph.degree.iter().filter(|&&d| d > 0).count() as f64;
    if s0 <= 0.0 {
        return Autocorrelation::unavailable();
    }

    let mut cross = 0.0;
    let mut s1 = 0.0;
    let mut col_sums = vec![0.0; n];
    for &(i, j) in &graph.edges {
        let (w_ij, w_ji) = (graph.weight(i), graph.weight(j));
        cross += (w_ij + w_ji) * z[i] * z[j];
        s1 += (w_ij + w_ji) * (w_ij + w_ji);
        col_sums[j] += w_ij;
        col_sums[i] += w_ji;
    }
    let s2: f64 = graph
        .degree
        .iter()
        .zip(&col_sums)
        .map(|(&d, &col)| {
            let row = if d > 0 { 1.0 } else { 0.0 };
            (row + col) * (row + col)
        })
        .sum();

    let nf = n as f64;
    let i_value = nf / s0 * cross / m2;

    let m4: f64 = z.iter().map(|d| d.powi(4)).sum();
    let b2 = nf * m4 / (m2 * m2);
    let expected = -1.0 / (nf - 1.0);

    let a = nf * ((nf * nf - 3.0 * nf + 3.0) * s1 - nf * s2 + 3.0 * s0 * s0);
    let b = b2 * ((nf * nf - nf) * s1 - 2.0 * nf * s2 + 6.0 * s0 * s0);
    let variance =
        (a - b) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0) * s0 * s0) - expected * expected;

    let p_value = if variance.is_finite() && variance > 1e-12 {
        let z_score = (i_value - expected) / variance.sqrt();
        Some((2.0 * (1.0 - normal_cdf(z_score.abs()))).clamp(0.0, 1.0))
    } else {
        None
    };

    Autocorrelation {
        value: Some(i_value),
        p_value,
    }
}
