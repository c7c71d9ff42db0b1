//! Two-period monitoring: reconstruct both periods, diff them, test the trends.
//!
//! Both periods are cut from a single store snapshot so an append landing
//! between the two reconstructions cannot make them disagree about the log.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::core::domain::{ChangeSummary, StatisticalTrend, TimeWindow};
use crate::error::AnalysisResult;
use crate::services::compare::{intensity_change_grid, IntensityGrid, TemporalDiff};
use crate::services::trackways::{TrackwayAnalysis, TrackwayAnalyzer};
use crate::services::trends::compute_statistical_trends;
use crate::store::{DetectionSnapshot, DetectionStore};

/// Everything the temporal comparison reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalAnalysis {
    pub period1: TrackwayAnalysis,
    pub period2: TrackwayAnalysis,
    pub change_summary: ChangeSummary,
    pub intensity_grid: Option<IntensityGrid>,
    pub statistical_summary: Vec<StatisticalTrend>,
    /// Checksum of the detection log state both periods were read from.
    pub snapshot_checksum: String,
}

/// Snapshot the store once and compare `window1` (baseline) with `window2`.
pub fn temporal_analysis(
    store: &dyn DetectionStore,
    window1: &TimeWindow,
    window2: &TimeWindow,
    config: &AnalysisConfig,
) -> AnalysisResult<TemporalAnalysis> {
    let analyzer = TrackwayAnalyzer::from_settings(config)?;
    let snapshot = store.snapshot()?;
    analyzer.check_coverage(&snapshot)?;
    Ok(temporal_analysis_of_snapshot(
        &analyzer, &snapshot, window1, window2, config,
    ))
}

/// Temporal comparison over an existing snapshot.
pub fn temporal_analysis_of_snapshot(
    analyzer: &TrackwayAnalyzer,
    snapshot: &DetectionSnapshot,
    window1: &TimeWindow,
    window2: &TimeWindow,
    config: &AnalysisConfig,
) -> TemporalAnalysis {
    log::info!(
        "Temporal analysis over {} detections (snapshot {})",
        snapshot.points.len(),
        snapshot.checksum
    );

    let period1 = analyzer.analyze(snapshot, window1);
    let period2 = analyzer.analyze(snapshot, window2);

    let settings = &config.monitoring;
    let change_summary = TemporalDiff::new(settings.buffer_distance, settings.buffer_quadrant_segments)
        .compare(&period1.trackways, &period2.trackways);
    let intensity_grid =
        intensity_change_grid(&period1.trackways, &period2.trackways, settings.cell_size);
    let statistical_summary = compute_statistical_trends(&period1.trackways, &period2.trackways);

    TemporalAnalysis {
        period1,
        period2,
        change_summary,
        intensity_grid,
        statistical_summary,
        snapshot_checksum: snapshot.checksum.clone(),
    }
}
