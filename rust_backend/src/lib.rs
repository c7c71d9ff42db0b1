//! Trackway analysis - movement paths reconstructed from object detections.
//!
//! Detection points are clustered into candidate paths, screened by
//! biological plausibility rules, measured, and then compared between
//! observation periods or against habitat layers.
//!
//! # Module Organization
//!
//! - [`core`]: Domain models and the planar geometry kernel
//! - [`store`]: Append-only detection log
//! - [`algorithms`]: Clustering, corridors, spatial index, statistics
//! - [`preprocessing`]: Plausibility validation of candidates
//! - [`raster`]: Habitat and degradation grids
//! - [`services`]: Trackway, habitat, temporal and trend analyses
//! - [`io`]: GeoJSON and ESRI ASCII interchange
//! - [`config`]: TOML configuration
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use trackway_analysis::config::AnalysisConfig;
//! use trackway_analysis::core::domain::DetectionPoint;
//! use trackway_analysis::services::TrackwayAnalyzer;
//!
//! let points: Vec<DetectionPoint> = (0..6)
//!     .map(|i| DetectionPoint::new(Utc.timestamp_opt(10 * i, 0).unwrap(), 4.0 * i as f64, 0.0, 0.9, "deer"))
//!     .collect();
//! let analysis = TrackwayAnalyzer::from_config(&AnalysisConfig::default()).analyze_points(&points);
//! assert_eq!(analysis.trackways.len(), 1);
//! assert_eq!(analysis.trackways[0].length, 20.0);
//! ```

pub mod algorithms;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod preprocessing;
pub mod raster;
pub mod services;
pub mod store;
pub mod time;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult};
