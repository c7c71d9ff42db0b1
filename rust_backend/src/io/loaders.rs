use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::core::domain::Trackway;
use crate::core::geometry::{Point2, Polyline};
use crate::error::{AnalysisError, AnalysisResult};
use crate::io::geojson::{parse_feature_collection, trackways_to_collection};
use crate::services::compare::IntensityGrid;

/// No-data marker written to ESRI ASCII grids.
pub const ASCII_GRID_NODATA: i64 = -9999;

/// Layout of a line geometry file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSourceType {
    /// JSON array of coordinate lists: `[[[x, y], ...], ...]`
    CoordinateArrays,
    /// GeoJSON `FeatureCollection`
    GeoJson,
}

impl LineSourceType {
    /// Decide from the first non-blank character of the document.
    pub fn detect(content: &str) -> Option<Self> {
        match content.trim_start().chars().next()? {
            '[' => Some(LineSourceType::CoordinateArrays),
            '{' => Some(LineSourceType::GeoJson),
            _ => None,
        }
    }
}

fn read_file(path: &Path, what: &str) -> AnalysisResult<String> {
    fs::read_to_string(path).map_err(|e| {
        AnalysisError::ConfigurationError(format!(
            "Failed to read {} {}: {}",
            what,
            path.display(),
            e
        ))
    })
}

/// Parse line geometries in either supported layout.
pub fn parse_lines_str(content: &str) -> AnalysisResult<Vec<Polyline>> {
    match LineSourceType::detect(content) {
        Some(LineSourceType::CoordinateArrays) => {
            let arrays: Vec<Vec<[f64; 2]>> = serde_json::from_str(content)?;
            Ok(arrays
                .into_iter()
                .map(|coords| Polyline::new(coords.into_iter().map(|[x, y]| Point2::new(x, y)).collect()))
                .filter(|line| !line.is_empty())
                .collect())
        }
        Some(LineSourceType::GeoJson) => Ok(parse_feature_collection(content)?.polylines()),
        None => Err(AnalysisError::InvalidInput(
            "Line geometry document is empty or not JSON".to_string(),
        )),
    }
}

/// Load the linear features (roads, fences, field edges) for the edge-distance metric.
///
/// A missing or unreadable file is a configuration error.
pub fn load_linear_features<P: AsRef<Path>>(path: P) -> AnalysisResult<Vec<Polyline>> {
    let path = path.as_ref();
    let content = read_file(path, "linear features")?;
    let lines = parse_lines_str(&content).map_err(|e| {
        AnalysisError::ConfigurationError(format!("{}: {}", path.display(), e))
    })?;
    log::info!("Loaded {} linear features from {}", lines.len(), path.display());
    Ok(lines)
}

/// Load manually mapped trackways from a GeoJSON file.
pub fn load_reference_trackways<P: AsRef<Path>>(path: P) -> AnalysisResult<Vec<Polyline>> {
    let path = path.as_ref();
    let content = read_file(path, "reference trackways")?;
    let lines = parse_feature_collection(&content)?.polylines();
    log::info!("Loaded {} reference trackways from {}", lines.len(), path.display());
    Ok(lines)
}

/// GeoJSON text for a set of trackways.
pub fn trackways_geojson_string(trackways: &[Trackway]) -> AnalysisResult<String> {
    Ok(serde_json::to_string_pretty(&trackways_to_collection(trackways))?)
}

/// Write trackways as a GeoJSON `FeatureCollection` of `LineString`s.
pub fn export_trackways_geojson<P: AsRef<Path>>(trackways: &[Trackway], path: P) -> AnalysisResult<()> {
    let path = path.as_ref();
    let collection = trackways_to_collection(trackways);
    if collection.features.is_empty() {
        log::warn!("No trackways with two or more points to export");
    }
    fs::write(path, serde_json::to_string_pretty(&collection)?)?;
    log::info!(
        "Exported {} trackways to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

/// ESRI ASCII grid text, northern row first.
pub fn intensity_grid_to_ascii(grid: &IntensityGrid) -> String {
    let lower_left = grid.lower_left();
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "ncols {}", grid.width);
    let _ = writeln!(out, "nrows {}", grid.height);
    let _ = writeln!(out, "xllcorner {}", lower_left.x);
    let _ = writeln!(out, "yllcorner {}", lower_left.y);
    let _ = writeln!(out, "cellsize {}", grid.cell_size);
    let _ = writeln!(out, "NODATA_value {}", ASCII_GRID_NODATA);
    for row in grid.cells.chunks(grid.width.max(1)) {
        let line: Vec<String> = row.iter().map(i64::to_string).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

/// Write the intensity-change grid for the rendering collaborator.
pub fn write_intensity_grid<P: AsRef<Path>>(grid: &IntensityGrid, path: P) -> AnalysisResult<()> {
    let path = path.as_ref();
    fs::write(path, intensity_grid_to_ascii(grid))?;
    log::info!(
        "Wrote {}x{} intensity grid to {}",
        grid.width,
        grid.height,
        path.display()
    );
    Ok(())
}
