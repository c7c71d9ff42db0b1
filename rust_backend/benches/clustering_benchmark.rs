use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use trackway_analysis::algorithms::clustering::TrajectoryClusterer;
use trackway_analysis::config::AnalysisConfig;
use trackway_analysis::core::domain::DetectionPoint;
use trackway_analysis::services::compare::compare_trackways;
use trackway_analysis::services::TrackwayAnalyzer;

/// `paths` straight walks of 20 points each, spaced far enough apart to stay
/// separate clusters.
fn synthetic_walks(paths: usize, x_offset: f64) -> Vec<DetectionPoint> {
    let mut points = Vec::with_capacity(paths * 20);
    for p in 0..paths {
        let y = (p as f64) * 500.0;
        for i in 0..20 {
            points.push(DetectionPoint::new(
                Utc.timestamp_opt(10 * i, 0).unwrap(),
                x_offset + 4.0 * i as f64,
                y + (i % 3) as f64,
                0.85,
                "deer",
            ));
        }
    }
    points
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");

    for paths in [10usize, 100, 500] {
        let points = synthetic_walks(paths, 0.0);
        group.bench_with_input(BenchmarkId::new("dbscan", points.len()), &points, |b, input| {
            let clusterer = TrajectoryClusterer::default();
            b.iter(|| clusterer.cluster(black_box(input)));
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let analyzer = TrackwayAnalyzer::from_config(&AnalysisConfig::default());
    let points = synthetic_walks(100, 0.0);
    group.bench_function("analyze_2000_points", |b| {
        b.iter(|| analyzer.analyze_points(black_box(&points)));
    });

    let period1 = analyzer.analyze_points(&synthetic_walks(100, 0.0)).trackways;
    let period2 = analyzer.analyze_points(&synthetic_walks(100, 3.0)).trackways;
    group.bench_function("temporal_diff_100x100", |b| {
        b.iter(|| compare_trackways(black_box(&period1), black_box(&period2), 10.0));
    });

    group.finish();
}

criterion_group!(benches, bench_clustering, bench_pipeline);
criterion_main!(benches);
