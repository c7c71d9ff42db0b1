//! Service layer: the analyses exposed to callers.
//!
//! Services sit on top of the algorithms and the detection store. Each one
//! recomputes its result from the detection points on every call.
//!
//! # Module Organization
//!
//! - [`trackways`]: Clustering, validation and metrics for one time window
//! - [`metrics`]: Per-trackway measurements and spatial autocorrelation
//! - [`habitat`]: Habitat density and ecological pressure
//! - [`compare`]: Temporal diff and intensity-change grid
//! - [`trends`]: Statistical trend tests between periods
//! - [`monitoring`]: Two-period analysis from one snapshot
//! - [`similarity`]: Detected versus manually mapped trackways

pub mod compare;
pub mod habitat;
pub mod metrics;
pub mod monitoring;
pub mod similarity;
pub mod trackways;
pub mod trends;

#[cfg(test)]
mod metrics_tests;

pub use compare::{compare_trackways, intensity_change_grid, IntensityGrid, TemporalDiff};
pub use habitat::{EcologicalPressure, HabitatCorrelator, HabitatImpact};
pub use metrics::{compute_metrics, morans_i};
pub use monitoring::{temporal_analysis, TemporalAnalysis};
pub use similarity::{calculate_similarity, SimilarityReport};
pub use trackways::{TrackwayAnalysis, TrackwayAnalyzer};
pub use trends::compute_statistical_trends;
