//! Integration tests for trackway reconstruction: clustering, plausibility
//! validation and per-trackway metrics, run through the public API.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use trackway_analysis::algorithms::clustering::TrajectoryClusterer;
use trackway_analysis::config::{AnalysisConfig, ValidationSettings};
use trackway_analysis::core::domain::{Candidate, DetectionPoint, TimeWindow};
use trackway_analysis::preprocessing::validator::{
    tortuosity, PlausibilityValidator, RejectionReason, Verdict,
};
use trackway_analysis::services::TrackwayAnalyzer;
use trackway_analysis::store::{DetectionStore, LocalDetectionStore};

// ==================== Helper Functions ====================

fn detection(seconds: i64, x: f64, y: f64) -> DetectionPoint {
    DetectionPoint::new(Utc.timestamp_opt(seconds, 0).unwrap(), x, y, 0.9, "deer")
}

fn candidate_from(coords: &[(f64, f64)]) -> Candidate {
    Candidate::new(
        0,
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| detection(i as i64, x, y))
            .collect(),
    )
}

// ==================== Boundary Examples ====================

#[test]
fn test_five_point_diagonal_is_one_cluster_and_too_short() {
    let points: Vec<DetectionPoint> = (0..5).map(|i| detection(i, i as f64, i as f64)).collect();

    let assignment = TrajectoryClusterer::new(50.0, 5).cluster(&points);
    assert_eq!(assignment.cluster_count(), 1);
    assert_eq!(assignment.clusters[&0], vec![0, 1, 2, 3, 4]);
    assert!(assignment.noise.is_empty());

    let (candidates, noise) = TrajectoryClusterer::new(50.0, 5).cluster_points(&points);
    assert_eq!(noise, 0);
    let length = candidates[0].path_length();
    assert!((length - 4.0 * 2f64.sqrt()).abs() < 1e-9);

    match PlausibilityValidator::default().evaluate(&candidates[0]) {
        Verdict::Rejected(RejectionReason::TooShort { length: observed, min_length }) => {
            assert!((observed - 5.657).abs() < 1e-3);
            assert_eq!(min_length, 10.0);
        }
        other => panic!("expected a length rejection, got {:?}", other),
    }

    let store = LocalDetectionStore::with_points(points);
    let analysis = TrackwayAnalyzer::from_config(&AnalysisConfig::default())
        .analyze(&store.snapshot().unwrap(), &TimeWindow::unbounded());
    assert!(analysis.trackways.is_empty());
    assert_eq!(analysis.stats.evaluated, 1);
    assert_eq!(analysis.stats.rejected_length, 1);
}

#[test]
fn test_accepted_trackway_metrics() {
    let points: Vec<DetectionPoint> = (0..8).map(|i| detection(10 * i, 3.0 * i as f64, 0.0)).collect();
    let analysis = TrackwayAnalyzer::from_config(&AnalysisConfig::default()).analyze_points(&points);

    assert_eq!(analysis.trackways.len(), 1);
    let trackway = &analysis.trackways[0];
    assert_eq!(trackway.points.len(), 8);
    assert!((trackway.length - 21.0).abs() < 1e-12);
    // Seven segments at 0.3 units/s plus the leading zero.
    assert!((trackway.average_speed - 0.3 * 7.0 / 8.0).abs() < 1e-12);
    assert!((trackway.confidence_mean - 0.9).abs() < 1e-12);
    assert_eq!(trackway.confidence_std, 0.0);
    assert_eq!(trackway.tortuosity(), Some(1.0));
    assert!(trackway.habitat_type.is_none());
    assert!(trackway.edge_distance.is_none());
}

#[test]
fn test_commuting_tag() {
    let points: Vec<DetectionPoint> = (0..6).map(|i| detection(i, 8.0 * i as f64, 0.0)).collect();
    let analysis = TrackwayAnalyzer::from_config(&AnalysisConfig::default()).analyze_points(&points);
    assert_eq!(analysis.trackways.len(), 1);
    assert!(analysis.trackways[0].behavior.is_some());
    assert_eq!(analysis.stats.commuting, 1);
}

// ==================== Properties ====================

fn coords_strategy(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-200.0f64..200.0, -200.0f64..200.0), 2..max_len)
}

proptest! {
    #[test]
    fn prop_tortuosity_at_least_one(coords in coords_strategy(12)) {
        let candidate = candidate_from(&coords);
        if candidate.end_to_end_displacement() > 0.0 {
            let t = tortuosity(&candidate).unwrap();
            prop_assert!(t >= 1.0 - 1e-9, "tortuosity {} below 1", t);
        } else {
            prop_assert!(tortuosity(&candidate).is_none());
        }
    }

    #[test]
    fn prop_short_paths_always_rejected(coords in coords_strategy(12), margin in 0.001f64..100.0) {
        let candidate = candidate_from(&coords);
        let settings = ValidationSettings {
            min_length: candidate.path_length() + margin,
            ..ValidationSettings::default()
        };
        let verdict = PlausibilityValidator::new(settings).evaluate(&candidate);
        let is_too_short = matches!(verdict, Verdict::Rejected(RejectionReason::TooShort { .. }));
        prop_assert!(is_too_short);
    }

    #[test]
    fn prop_noise_never_in_trackways(coords in prop::collection::vec((0.0f64..400.0, 0.0f64..400.0), 0..80)) {
        // Unique timestamps identify each input point.
        let points: Vec<DetectionPoint> = coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| detection(i as i64, x, y))
            .collect();
        let clusterer = TrajectoryClusterer::new(40.0, 4);
        let assignment = clusterer.cluster(&points);

        let mut config = AnalysisConfig::default();
        config.clustering.eps = 40.0;
        config.clustering.min_pts = 4;
        config.validation.min_length = 0.0;
        config.validation.max_speed = f64::INFINITY;
        config.validation.max_turn_angle_deg = 360.0;
        config.validation.max_tortuosity = f64::INFINITY;
        let analysis = TrackwayAnalyzer::from_config(&config).analyze_points(&points);

        prop_assert_eq!(analysis.noise_points, assignment.noise.len());
        for trackway in &analysis.trackways {
            for point in &trackway.points {
                let index = point.timestamp.timestamp() as usize;
                prop_assert!(assignment.labels[index].is_some());
            }
        }
    }

    #[test]
    fn prop_clustering_is_deterministic(coords in prop::collection::vec((0.0f64..300.0, 0.0f64..300.0), 0..60)) {
        let points: Vec<DetectionPoint> = coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| detection(i as i64, x, y))
            .collect();
        let clusterer = TrajectoryClusterer::new(35.0, 3);
        prop_assert_eq!(clusterer.cluster(&points), clusterer.cluster(&points));
    }
}
