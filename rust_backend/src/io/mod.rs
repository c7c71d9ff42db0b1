//! Interchange with GIS and rendering collaborators.
//!
//! Reads line geometries (linear features, manually mapped trackways) and
//! writes trackways as GeoJSON and intensity grids as ESRI ASCII.
//!
//! # Example
//!
//! ```no_run
//! use trackway_analysis::io::load_linear_features;
//!
//! let features = load_linear_features("data/roads.geojson")?;
//! println!("Loaded {} linear features", features.len());
//! # Ok::<(), trackway_analysis::error::AnalysisError>(())
//! ```

pub mod geojson;
pub mod loaders;


pub use loaders::{
    export_trackways_geojson, intensity_grid_to_ascii, load_linear_features,
    load_reference_trackways, trackways_geojson_string, write_intensity_grid, LineSourceType,
};
