//! Domain models for detection points, trackways and their derived summaries.
//!
//! Detection points are the only immutable inputs of the system. Everything
//! else in this module (candidates, trackways, change summaries, statistical
//! trends) is a query-time view recomputed on every analysis call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::geometry::{Point2, Polyline};

/// A single timestamped, geolocated object detection.
///
/// Coordinates are planar (projected) units; the same unit is used for the
/// clustering radius, buffer distances and raster transforms.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use trackway_analysis::core::domain::DetectionPoint;
///
/// let point = DetectionPoint::new(Utc.timestamp_opt(0, 0).unwrap(), 1.0, 2.0, 0.9, "deer");
/// assert_eq!(point.position().x, 1.0);
/// assert!(point.source.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPoint {
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
    pub label: String,
    /// Image the detection came from, when the detector reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl DetectionPoint {
    pub fn new(
        timestamp: DateTime<Utc>,
        x: f64,
        y: f64,
        confidence: f64,
        label: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            x,
            y,
            confidence,
            label: label.into(),
            source: None,
        }
    }

    /// Attach the originating image name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// Half-open time window `[start, end)`.
///
/// A missing bound leaves that side of the window open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Window covering the whole log.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let after_start = self.start.map_or(true, |start| *timestamp >= start);
        let before_end = self.end.map_or(true, |end| *timestamp < end);
        after_start && before_end
    }
}

/// Group of detection points sharing a cluster label, sorted by timestamp.
///
/// Candidates are ephemeral: they exist between clustering and validation and
/// are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub cluster_id: usize,
    pub points: Vec<DetectionPoint>,
}

impl Candidate {
    /// Build a candidate, ordering its points by ascending timestamp.
    ///
    /// The sort is stable so points sharing a timestamp keep their log order.
    pub fn new(cluster_id: usize, mut points: Vec<DetectionPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { cluster_id, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn polyline(&self) -> Polyline {
        Polyline::new(self.points.iter().map(DetectionPoint::position).collect())
    }

    /// Euclidean displacement of each consecutive pair of points.
    pub fn displacements(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|pair| pair[0].position().distance(&pair[1].position()))
            .collect()
    }

    /// Sum of consecutive displacements.
    pub fn path_length(&self) -> f64 {
        self.displacements().iter().sum()
    }

    /// Speed per point, aligned with `points`.
    ///
    /// The first point has no preceding segment and reports 0. A segment with
    /// zero elapsed time reports 0 when the animal did not move and +inf when
    /// it did.
    pub fn point_speeds(&self) -> Vec<f64> {
        let mut speeds = Vec::with_capacity(self.points.len());
        if self.points.is_empty() {
            return speeds;
        }
        speeds.push(0.0);
        for pair in self.points.windows(2) {
            let displacement = pair[0].position().distance(&pair[1].position());
            let elapsed = elapsed_seconds(&pair[0].timestamp, &pair[1].timestamp);
            speeds.push(segment_speed(displacement, elapsed));
        }
        speeds
    }

    /// Straight-line distance between the first and last point.
    pub fn end_to_end_displacement(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() >= 2 => {
                first.position().distance(&last.position())
            }
            _ => 0.0,
        }
    }
}

pub(crate) fn elapsed_seconds(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    (*to - *from)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| (*to - *from).num_milliseconds() as f64 / 1000.0)
}

pub(crate) fn segment_speed(displacement: f64, elapsed: f64) -> f64 {
    if displacement == 0.0 {
        0.0
    } else if elapsed == 0.0 {
        f64::INFINITY
    } else {
        displacement / elapsed
    }
}

/// Stable identifier of a trackway within one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackwayId(pub u64);

impl fmt::Display for TrackwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Moran's I of a per-point attribute along a trackway.
///
/// Both fields are `None` when the statistic could not be formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Autocorrelation {
    pub value: Option<f64>,
    pub p_value: Option<f64>,
}

impl Autocorrelation {
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Behaviour annotation attached by the plausibility validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementBehavior {
    Commuting,
}

/// A validated, time-ordered movement path.
///
/// Only produced for candidates that passed plausibility validation, so a
/// trackway always holds at least two points in non-decreasing time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trackway {
    pub id: TrackwayId,
    pub points: Vec<DetectionPoint>,
    pub length: f64,
    pub average_speed: f64,
    pub confidence_mean: f64,
    pub confidence_std: f64,
    pub spatial_autocorrelation: Autocorrelation,
    pub habitat_type: Option<i64>,
    pub behavior: Option<MovementBehavior>,
    /// Mean distance to the nearest linear feature, when features were supplied.
    pub edge_distance: Option<f64>,
}

impl Trackway {
    pub fn polyline(&self) -> Polyline {
        Polyline::new(self.points.iter().map(DetectionPoint::position).collect())
    }

    /// Path length over end-to-end displacement; `None` for closed loops.
    pub fn tortuosity(&self) -> Option<f64> {
        let polyline = self.polyline();
        let displacement = polyline.end_to_end();
        if displacement > 0.0 {
            Some(self.length / displacement)
        } else {
            None
        }
    }

    /// Arithmetic mean of the point coordinates.
    pub fn centroid(&self) -> Option<Point2> {
        self.polyline().vertex_centroid()
    }
}

/// Area covered by one habitat category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HabitatArea {
    pub category: i64,
    pub area: f64,
}

/// Classification of trackways between a baseline and a comparison period.
///
/// `retained` lists the baseline ids matched by at least one comparison
/// trackway, so `abandoned` and `retained` partition the baseline ids just as
/// `new` and `modified` partition the comparison ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub new: Vec<TrackwayId>,
    pub abandoned: Vec<TrackwayId>,
    pub modified: Vec<TrackwayId>,
    pub retained: Vec<TrackwayId>,
}

/// Metric compared between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Length,
    AverageSpeed,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 2] = [TrendMetric::Length, TrendMetric::AverageSpeed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::Length => "length",
            TrendMetric::AverageSpeed => "average_speed",
        }
    }

    pub fn value_of(&self, trackway: &Trackway) -> f64 {
        match self {
            TrendMetric::Length => trackway.length,
            TrendMetric::AverageSpeed => trackway.average_speed,
        }
    }
}

impl fmt::Display for TrendMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-sided confidence interval around a sample mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Result of comparing one metric between two periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalTrend {
    pub metric: TrendMetric,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub significant: bool,
    pub period1_mean: f64,
    pub period2_mean: f64,
    pub ci1: Option<ConfidenceInterval>,
    pub ci2: Option<ConfidenceInterval>,
    pub n1: usize,
    pub n2: usize,
}
