//! Analysis configuration file support.
//!
//! Every tunable constant of the pipeline can be overridden from a TOML file.
//! Missing sections and keys fall back to the defaults below.
//!
//! ```toml
//! [clustering]
//! eps = 50.0
//! min_pts = 5
//!
//! [validation]
//! min_length = 10.0
//! zero_displacement = "skip"
//!
//! [monitoring]
//! buffer_distance = 10.0
//! cell_size = 10.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, AnalysisResult};

/// p-value below which a trend is reported as significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Complete analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub clustering: ClusteringSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub habitat: HabitatSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub units: UnitSettings,
}

/// Density clustering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringSettings {
    #[serde(default = "default_eps")]
    pub eps: f64,
    #[serde(default = "default_min_pts")]
    pub min_pts: usize,
}

/// How the tortuosity rule treats a trackway that ends where it started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDisplacementPolicy {
    /// Skip the tortuosity rule; closed loops pass regardless of shape.
    #[default]
    Skip,
    /// Treat the loop as infinitely tortuous and reject it.
    Reject,
}

/// Biological plausibility thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_min_length")]
    pub min_length: f64,
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_max_turn_angle")]
    pub max_turn_angle_deg: f64,
    #[serde(default = "default_max_tortuosity")]
    pub max_tortuosity: f64,
    #[serde(default = "default_min_commuting_speed")]
    pub min_commuting_speed: f64,
    #[serde(default = "default_max_commuting_tortuosity")]
    pub max_commuting_tortuosity: f64,
    #[serde(default)]
    pub zero_displacement: ZeroDisplacementPolicy,
}

/// Temporal comparison settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    #[serde(default = "default_buffer_distance")]
    pub buffer_distance: f64,
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    #[serde(default = "default_quadrant_segments")]
    pub buffer_quadrant_segments: usize,
}

/// Habitat and degradation raster locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitatSettings {
    #[serde(default)]
    pub habitat_raster: Option<PathBuf>,
    #[serde(default)]
    pub degradation_raster: Option<PathBuf>,
    #[serde(default)]
    pub linear_features: Option<PathBuf>,
}

/// Detection log location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_detections_path")]
    pub detections_path: PathBuf,
}

/// Unit convention for every distance-valued setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateUnits {
    /// Projected planar coordinates (metres). Geographic degrees must be
    /// projected before they reach the store.
    #[default]
    Projected,
    /// Raw image pixel coordinates.
    Pixel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitSettings {
    #[serde(default)]
    pub coordinate_units: CoordinateUnits,
}

fn default_eps() -> f64 {
    50.0
}

fn default_min_pts() -> usize {
    5
}

fn default_min_length() -> f64 {
    10.0
}

fn default_max_speed() -> f64 {
    15.0
}

fn default_max_turn_angle() -> f64 {
    90.0
}

fn default_max_tortuosity() -> f64 {
    5.0
}

fn default_min_commuting_speed() -> f64 {
    5.0
}

fn default_max_commuting_tortuosity() -> f64 {
    1.2
}

fn default_buffer_distance() -> f64 {
    10.0
}

fn default_cell_size() -> f64 {
    10.0
}

fn default_quadrant_segments() -> usize {
    8
}

fn default_detections_path() -> PathBuf {
    PathBuf::from("detections/detections.csv")
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            min_pts: default_min_pts(),
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_speed: default_max_speed(),
            max_turn_angle_deg: default_max_turn_angle(),
            max_tortuosity: default_max_tortuosity(),
            min_commuting_speed: default_min_commuting_speed(),
            max_commuting_tortuosity: default_max_commuting_tortuosity(),
            zero_displacement: ZeroDisplacementPolicy::default(),
        }
    }
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            buffer_distance: default_buffer_distance(),
            cell_size: default_cell_size(),
            buffer_quadrant_segments: default_quadrant_segments(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            detections_path: default_detections_path(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(AnalysisConfig)` if the file parses and validates
    /// * `Err(AnalysisError::ConfigurationError)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            AnalysisError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> AnalysisResult<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `trackways.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> AnalysisResult<Self> {
        let search_paths = [
            PathBuf::from("trackways.toml"),
            PathBuf::from("rust_backend/trackways.toml"),
            PathBuf::from("../trackways.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(AnalysisError::ConfigurationError(
            "No trackways.toml found in standard locations".to_string(),
        ))
    }

    /// Reject settings the algorithms cannot run with.
    pub fn validate(&self) -> AnalysisResult<()> {
        let positive = [
            ("clustering.eps", self.clustering.eps),
            ("monitoring.buffer_distance", self.monitoring.buffer_distance),
            ("monitoring.cell_size", self.monitoring.cell_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnalysisError::ConfigurationError(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if self.clustering.min_pts == 0 {
            return Err(AnalysisError::ConfigurationError(
                "clustering.min_pts must be at least 1".to_string(),
            ));
        }

        if self.monitoring.buffer_quadrant_segments == 0 {
            return Err(AnalysisError::ConfigurationError(
                "monitoring.buffer_quadrant_segments must be at least 1".to_string(),
            ));
        }

        let v = &self.validation;
        let thresholds = [
            ("validation.min_length", v.min_length),
            ("validation.max_speed", v.max_speed),
            ("validation.max_turn_angle_deg", v.max_turn_angle_deg),
            ("validation.max_tortuosity", v.max_tortuosity),
            ("validation.min_commuting_speed", v.min_commuting_speed),
            ("validation.max_commuting_tortuosity", v.max_commuting_tortuosity),
        ];
        for (name, value) in thresholds {
            if value.is_nan() || value < 0.0 {
                return Err(AnalysisError::ConfigurationError(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
