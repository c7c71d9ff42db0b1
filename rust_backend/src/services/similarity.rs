//! Agreement between detected trackways and manually mapped reference lines.
//!
//! A detected trackway matches a reference line when the two geometries
//! intersect. Overlap is measured along the reference: each matched reference
//! is cut into equal pieces and a piece counts as covered when its midpoint
//! lies within `tolerance` of a matching detection.

use serde::{Deserialize, Serialize};

use crate::core::domain::TrackwayId;
use crate::core::geometry::{hausdorff_distance, Polyline};

/// Pieces each reference line is cut into when measuring coverage.
pub const OVERLAP_SAMPLES: usize = 200;

/// One detected/reference pair that intersect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub detected_id: TrackwayId,
    /// Position of the reference line in the input slice.
    pub reference_index: usize,
    /// Hausdorff distance between the two lines.
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Covered reference length as a percentage of total reference length.
    pub overlap_percentage: f64,
    pub average_offset: Option<f64>,
    /// Percentage of reference lines matched by at least one detection.
    pub detection_completeness: f64,
    pub matches: Vec<SimilarityMatch>,
}

impl SimilarityReport {
    fn empty() -> Self {
        Self {
            overlap_percentage: 0.0,
            average_offset: None,
            detection_completeness: 0.0,
            matches: Vec::new(),
        }
    }
}

/// Compare detected trackways with reference lines.
pub fn calculate_similarity(
    detected: &[(TrackwayId, Polyline)],
    reference: &[Polyline],
    tolerance: f64,
) -> SimilarityReport {
    log::info!(
        "Comparing {} detected trackways with {} reference lines",
        detected.len(),
        reference.len()
    );

    let mut matches = Vec::new();
    let mut covered_length = 0.0;
    let mut matched_references = 0usize;

    for (reference_index, reference_line) in reference.iter().enumerate() {
        let hits: Vec<&(TrackwayId, Polyline)> = detected
            .iter()
            .filter(|(_, line)| line.intersects(reference_line))
            .collect();
        if hits.is_empty() {
            continue;
        }
        matched_references += 1;

        let lines: Vec<&Polyline> = hits.iter().map(|(_, line)| line).collect();
        covered_length += covered_length_along(reference_line, &lines, tolerance);

        for (detected_id, line) in hits {
            if let Some(offset) = hausdorff_distance(line, reference_line) {
                matches.push(SimilarityMatch {
                    detected_id: *detected_id,
                    reference_index,
                    offset,
                });
            }
        }
    }

    if matches.is_empty() {
        log::warn!("No detected trackway intersects a reference line");
        return SimilarityReport::empty();
    }

    let total_length: f64 = reference.iter().map(Polyline::length).sum();
    let overlap_percentage = if total_length > 0.0 {
        covered_length / total_length * 100.0
    } else {
        0.0
    };
    let average_offset =
        Some(matches.iter().map(|m| m.offset).sum::<f64>() / matches.len() as f64);

    SimilarityReport {
        overlap_percentage,
        average_offset,
        detection_completeness: matched_references as f64 / reference.len() as f64 * 100.0,
        matches,
    }
}

/// Length of `reference` lying within `tolerance` of any of `lines`.
fn covered_length_along(reference: &Polyline, lines: &[&Polyline], tolerance: f64) -> f64 {
    let length = reference.length();
    if length <= 0.0 {
        return 0.0;
    }
    let piece = length / OVERLAP_SAMPLES as f64;
    let covered = (0..OVERLAP_SAMPLES)
        .filter_map(|i| reference.interpolate((i as f64 + 0.5) * piece))
        .filter(|p| lines.iter().any(|l| l.distance_to_point(p) <= tolerance))
        .count();
    covered as f64 * piece
}
