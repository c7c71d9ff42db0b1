//! Core domain models for trackway analysis.
//!
//! This module defines the data structures shared by every pipeline stage
//! (detection points, candidates, trackways, change summaries) and the planar
//! geometry kernel they are measured with.

pub mod domain;
pub mod geometry;

pub use domain::{
    Autocorrelation, Candidate, ChangeSummary, ConfidenceInterval, DetectionPoint, HabitatArea,
    MovementBehavior, StatisticalTrend, TimeWindow, Trackway, TrackwayId, TrendMetric,
};
pub use geometry::{BoundingBox, Point2, Polyline};
