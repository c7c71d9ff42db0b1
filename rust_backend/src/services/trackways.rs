//! Trackway reconstruction: cluster, validate, measure.
//!
//! Nothing here is cached. Every call re-clusters the detection points it is
//! given, so two calls over the same snapshot and window return the same
//! trackways.

use serde::{Deserialize, Serialize};

use crate::algorithms::clustering::TrajectoryClusterer;
use crate::config::AnalysisConfig;
use crate::core::domain::{DetectionPoint, TimeWindow, Trackway, TrackwayId};
use crate::core::geometry::Polyline;
use crate::error::AnalysisResult;
use crate::io::load_linear_features;
use crate::preprocessing::validator::{PlausibilityValidator, ValidationStats, Verdict};
use crate::services::habitat::HabitatCorrelator;
use crate::services::metrics::compute_metrics;
use crate::store::DetectionSnapshot;

/// Trackways reconstructed from one time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackwayAnalysis {
    pub trackways: Vec<Trackway>,
    pub stats: ValidationStats,
    /// Points discarded by clustering.
    pub noise_points: usize,
}

/// Runs clustering, plausibility validation, metrics and the habitat lookup.
#[derive(Debug, Clone)]
pub struct TrackwayAnalyzer {
    clusterer: TrajectoryClusterer,
    validator: PlausibilityValidator,
    habitat: Option<HabitatCorrelator>,
    linear_features: Vec<Polyline>,
}

impl TrackwayAnalyzer {
    pub fn new(clusterer: TrajectoryClusterer, validator: PlausibilityValidator) -> Self {
        Self {
            clusterer,
            validator,
            habitat: None,
            linear_features: Vec::new(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            TrajectoryClusterer::new(config.clustering.eps, config.clustering.min_pts),
            PlausibilityValidator::new(config.validation.clone()),
        )
    }

    /// Build an analyzer and load the habitat raster and linear features the
    /// configuration names. A raster or feature file that cannot be read, or a
    /// raster whose CRS does not fit the configured coordinate units, aborts
    /// the request.
    pub fn from_settings(config: &AnalysisConfig) -> AnalysisResult<Self> {
        let mut analyzer = Self::from_config(config);
        if config.habitat.habitat_raster.is_some() {
            let correlator = HabitatCorrelator::from_settings(&config.habitat)?;
            correlator.check_units(config.units.coordinate_units)?;
            analyzer = analyzer.with_habitat(correlator);
        }
        if let Some(path) = &config.habitat.linear_features {
            analyzer = analyzer.with_linear_features(load_linear_features(path)?);
        }
        Ok(analyzer)
    }

    /// Tag each trackway with the habitat category under its centroid.
    pub fn with_habitat(mut self, habitat: HabitatCorrelator) -> Self {
        self.habitat = Some(habitat);
        self
    }

    /// Features used for the edge-distance metric.
    pub fn with_linear_features(mut self, features: Vec<Polyline>) -> Self {
        self.linear_features = features;
        self
    }

    pub fn habitat(&self) -> Option<&HabitatCorrelator> {
        self.habitat.as_ref()
    }

    /// Fail when a habitat raster is loaded and the snapshot lies wholly outside it.
    pub fn check_coverage(&self, snapshot: &DetectionSnapshot) -> AnalysisResult<()> {
        match &self.habitat {
            Some(habitat) => habitat.check_coverage(&snapshot.points),
            None => Ok(()),
        }
    }

    /// Analyse the points of `snapshot` falling inside `window`.
    pub fn analyze(&self, snapshot: &DetectionSnapshot, window: &TimeWindow) -> TrackwayAnalysis {
        match snapshot.require_within(window) {
            Ok(points) => self.analyze_points(&points),
            Err(e) => {
                log::warn!("{}", e);
                TrackwayAnalysis::default()
            }
        }
    }

    /// Analyse an already filtered set of detections.
    ///
    /// Trackway ids are the cluster ids, which follow discovery order.
    pub fn analyze_points(&self, points: &[DetectionPoint]) -> TrackwayAnalysis {
        let (candidates, noise_points) = self.clusterer.cluster_points(points);
        let mut stats = ValidationStats::default();
        let mut trackways = Vec::new();

        for candidate in &candidates {
            if candidate.len() < 2 {
                log::debug!("Cluster {} has a single point, skipped", candidate.cluster_id);
                continue;
            }
            let verdict = self.validator.evaluate(candidate);
            stats.record(&verdict);
            if let Verdict::Accepted { behavior } = verdict {
                trackways.push(compute_metrics(
                    TrackwayId(candidate.cluster_id as u64),
                    candidate,
                    behavior,
                    &self.linear_features,
                ));
            }
        }

        if let Some(habitat) = &self.habitat {
            habitat.assign(&mut trackways);
        }

        log::info!(
            "Reconstructed {} trackways from {} points ({} candidates, {} rejected, {} noise)",
            trackways.len(),
            points.len(),
            candidates.len(),
            stats.rejected(),
            noise_points
        );

        TrackwayAnalysis {
            trackways,
            stats,
            noise_points,
        }
    }
}
