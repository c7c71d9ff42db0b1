//! Integration tests for two-period monitoring: the temporal diff, the
//! intensity grid, the trend tests and the CSV detection log they read from.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeSet;
use tempfile::tempdir;
use trackway_analysis::config::AnalysisConfig;
use trackway_analysis::core::domain::{
    Autocorrelation, DetectionPoint, TimeWindow, Trackway, TrackwayId, TrendMetric,
};
use trackway_analysis::core::geometry::{Point2, Polyline};
use trackway_analysis::error::AnalysisError;
use trackway_analysis::services::compare::TemporalDiff;
use trackway_analysis::services::monitoring::temporal_analysis;
use trackway_analysis::services::trends::compute_statistical_trends;
use trackway_analysis::store::{CsvDetectionStore, DetectionStore};

// ==================== Helper Functions ====================

fn detection(seconds: i64, x: f64, y: f64) -> DetectionPoint {
    DetectionPoint::new(Utc.timestamp_opt(seconds, 0).unwrap(), x, y, 0.75, "deer")
        .with_source(format!("frame_{:04}.jpg", seconds))
}

fn trackway_with(id: u64, length: f64, average_speed: f64) -> Trackway {
    Trackway {
        id: TrackwayId(id),
        points: vec![detection(0, 0.0, 0.0), detection(1, length, 0.0)],
        length,
        average_speed,
        confidence_mean: 0.75,
        confidence_std: 0.0,
        spatial_autocorrelation: Autocorrelation::unavailable(),
        habitat_type: None,
        behavior: None,
        edge_distance: None,
    }
}

fn walk(x0: f64, y0: f64, t0: i64) -> Vec<DetectionPoint> {
    (0..6).map(|i| detection(t0 + 10 * i, x0 + 5.0 * i as f64, y0)).collect()
}

fn window(start: i64, end: i64) -> TimeWindow {
    TimeWindow::between(
        Utc.timestamp_opt(start, 0).unwrap(),
        Utc.timestamp_opt(end, 0).unwrap(),
    )
}

// ==================== Statistical Trends ====================

#[test]
fn test_separated_speed_means_are_significant() {
    let period1: Vec<Trackway> = (0..10)
        .map(|i| trackway_with(i, 50.0 + i as f64, 1.0 + 0.05 * (i % 3) as f64))
        .collect();
    let period2: Vec<Trackway> = (0..10)
        .map(|i| trackway_with(100 + i, 50.0 + i as f64, 10.0 + 0.05 * (i % 4) as f64))
        .collect();

    let trends = compute_statistical_trends(&period1, &period2);
    let speed = trends
        .iter()
        .find(|t| t.metric == TrendMetric::AverageSpeed)
        .unwrap();
    assert!(speed.significant);
    assert!(speed.p_value.unwrap() < 0.05);
    assert!((speed.period1_mean - 1.045).abs() < 1e-9);
    assert!(speed.period2_mean > 10.0);

    // Lengths are identical in both periods.
    let length = trends.iter().find(|t| t.metric == TrendMetric::Length).unwrap();
    assert!(!length.significant);
    assert!((length.p_value.unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_same_distribution_is_not_significant() {
    let a = [5.1, 4.9, 5.3, 4.7, 5.0, 5.2, 4.8, 5.05, 4.95, 5.0];
    let b = [5.0, 5.2, 4.8, 5.1, 4.9, 4.85, 5.15, 5.0, 5.05, 4.95];
    let period1: Vec<Trackway> = a.iter().enumerate().map(|(i, &s)| trackway_with(i as u64, 30.0, s)).collect();
    let period2: Vec<Trackway> = b.iter().enumerate().map(|(i, &s)| trackway_with(i as u64, 30.0, s)).collect();

    let speed = compute_statistical_trends(&period1, &period2)
        .into_iter()
        .find(|t| t.metric == TrendMetric::AverageSpeed)
        .unwrap();
    assert!(!speed.significant);
    assert!(speed.p_value.unwrap() > 0.5);
    let (ci1, ci2) = (speed.ci1.unwrap(), speed.ci2.unwrap());
    assert!(ci1.contains(5.0) && ci2.contains(5.0));
}

// ==================== Temporal Diff ====================

#[test]
fn test_diff_edge_cases() {
    let diff = TemporalDiff::new(10.0, 8);
    let lines = vec![
        (TrackwayId(3), Polyline::new(vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)])),
        (TrackwayId(1), Polyline::new(vec![Point2::new(0.0, 50.0), Point2::new(10.0, 50.0)])),
    ];

    let only_new = diff.compare_lines(&[], &lines);
    assert_eq!(only_new.new, vec![TrackwayId(1), TrackwayId(3)]);
    assert!(only_new.abandoned.is_empty() && only_new.modified.is_empty());

    let only_abandoned = diff.compare_lines(&lines, &[]);
    assert_eq!(only_abandoned.abandoned, vec![TrackwayId(1), TrackwayId(3)]);
    assert!(only_abandoned.new.is_empty() && only_abandoned.modified.is_empty());
}

fn segment_strategy() -> impl Strategy<Value = Polyline> {
    (0.0f64..500.0, 0.0f64..500.0, -60.0f64..60.0, -60.0f64..60.0).prop_map(|(x, y, dx, dy)| {
        Polyline::new(vec![Point2::new(x, y), Point2::new(x + dx, y + dy)])
    })
}

proptest! {
    #[test]
    fn prop_diff_partitions_both_periods(
        p1 in prop::collection::vec(segment_strategy(), 0..15),
        p2 in prop::collection::vec(segment_strategy(), 0..15),
        buffer in 0.5f64..40.0,
    ) {
        let period1: Vec<(TrackwayId, Polyline)> =
            p1.into_iter().enumerate().map(|(i, l)| (TrackwayId(i as u64), l)).collect();
        let period2: Vec<(TrackwayId, Polyline)> =
            p2.into_iter().enumerate().map(|(i, l)| (TrackwayId(1000 + i as u64), l)).collect();

        let summary = TemporalDiff::new(buffer, 8).compare_lines(&period1, &period2);

        let ids1: BTreeSet<TrackwayId> = period1.iter().map(|(id, _)| *id).collect();
        let ids2: BTreeSet<TrackwayId> = period2.iter().map(|(id, _)| *id).collect();
        let new: BTreeSet<TrackwayId> = summary.new.iter().copied().collect();
        let modified: BTreeSet<TrackwayId> = summary.modified.iter().copied().collect();
        let abandoned: BTreeSet<TrackwayId> = summary.abandoned.iter().copied().collect();
        let retained: BTreeSet<TrackwayId> = summary.retained.iter().copied().collect();

        prop_assert!(new.is_disjoint(&modified));
        prop_assert_eq!(new.union(&modified).copied().collect::<BTreeSet<_>>(), ids2);
        prop_assert!(abandoned.is_disjoint(&retained));
        prop_assert_eq!(abandoned.union(&retained).copied().collect::<BTreeSet<_>>(), ids1);
        prop_assert_eq!(summary.new.len(), new.len());
        prop_assert_eq!(summary.abandoned.len(), abandoned.len());
    }
}

// ==================== CSV Log End to End ====================

#[test]
fn test_csv_log_round_trip() {
    let dir = tempdir().unwrap();
    let store = CsvDetectionStore::new(dir.path().join("detections").join("detections.csv"));
    assert!(store.snapshot().unwrap().is_empty());

    let first = walk(0.0, 0.0, 0);
    store.append_batch(&first).unwrap();
    let before = store.snapshot().unwrap();
    assert_eq!(before.points, first);

    store.append(&detection(500, 1.0, 2.0)).unwrap();
    let after = store.snapshot().unwrap();
    assert_eq!(after.points.len(), 7);
    assert_eq!(&after.points[..6], &first[..]);
    assert_ne!(before.checksum, after.checksum);

    let content = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(content.matches("timestamp,filename").count(), 1);
}

#[test]
fn test_corrupt_row_is_upstream_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("detections.csv");
    std::fs::write(
        &path,
        "timestamp,filename,x_center,y_center,score,label\n2025-09-05 10:00:00,a.jpg,1.0,2.0,1.7,deer\n",
    )
    .unwrap();
    let result = CsvDetectionStore::new(&path).snapshot();
    assert!(matches!(result, Err(AnalysisError::UpstreamFailure(_))));
}

#[test]
fn test_temporal_analysis_from_csv_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("detections.csv");
    let store = CsvDetectionStore::new(&path);

    // Period 1: trackways along y = 0 and y = 300.
    // Period 2: y = 0 again (shifted 3 units), y = 300 gone, a new one at y = 600.
    store.append_batch(&walk(0.0, 0.0, 0)).unwrap();
    store.append_batch(&walk(0.0, 300.0, 0)).unwrap();
    store.append_batch(&walk(0.0, 3.0, 1000)).unwrap();
    store.append_batch(&walk(0.0, 600.0, 1000)).unwrap();

    let mut config = AnalysisConfig::default();
    config.store.detections_path = path.clone();

    let result = temporal_analysis(&store, &window(0, 1000), &window(1000, 2000), &config).unwrap();

    assert_eq!(result.period1.trackways.len(), 2);
    assert_eq!(result.period2.trackways.len(), 2);
    assert_eq!(result.change_summary.modified, vec![TrackwayId(0)]);
    assert_eq!(result.change_summary.new, vec![TrackwayId(1)]);
    assert_eq!(result.change_summary.abandoned, vec![TrackwayId(1)]);
    assert_eq!(result.change_summary.retained, vec![TrackwayId(0)]);

    let grid = result.intensity_grid.unwrap();
    assert_eq!(grid.width, 3);
    assert_eq!(grid.height, 60);
    assert_eq!(result.statistical_summary.len(), 2);
    assert_eq!(result.snapshot_checksum, store.snapshot().unwrap().checksum);
}
