//! Spatial and statistical algorithms.
//!
//! These are the building blocks the services compose. None of them touch the
//! detection store or the filesystem.
//!
//! # Components
//!
//! - [`clustering`]: Density-based clustering of detection points
//! - [`spatial_index`]: Uniform grid over bounding boxes
//! - [`buffer`]: Tolerance corridors around polylines
//! - [`stats`]: Descriptive statistics, Student's t and Welch's test
//!
//! # Example
//!
//! ```
//! use trackway_analysis::algorithms::stats::welch_t_test;
//!
//! let before = [1.0, 1.1, 0.9, 1.0];
//! let after = [10.0, 10.2, 9.8, 10.1];
//! let test = welch_t_test(&before, &after).unwrap();
//! assert!(test.p_value < 0.05);
//! ```

pub mod buffer;
pub mod clustering;
pub mod spatial_index;
pub mod stats;

pub use buffer::{Corridor, CorridorSet};
pub use clustering::{ClusterAssignment, TrajectoryClusterer};
pub use spatial_index::GridSpatialIndex;
pub use stats::{mean_confidence_interval, welch_t_test, WelchTest};
