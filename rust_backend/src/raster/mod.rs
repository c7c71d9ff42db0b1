//! Georeferenced grids for habitat classes and degradation values.
//!
//! A raster is a row-major 2-D grid plus a north-up affine transform. Row 0 is
//! the northern edge, so `pixel_height` is normally negative. Rasters arrive as
//! JSON documents:
//!
//! ```json
//! {
//!   "width": 2, "height": 1,
//!   "transform": { "origin_x": 0.0, "origin_y": 10.0, "pixel_width": 1.0, "pixel_height": -1.0 },
//!   "nodata": -1.0,
//!   "crs": "EPSG:32633",
//!   "cells": [1.0, 2.0]
//! }
//! ```
//!
//! Rasters are read-only once loaded and may be shared across analyses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::geometry::{BoundingBox, Point2};
use crate::error::{AnalysisError, AnalysisResult};

/// North-up affine pixel <-> world transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Transform with square cells and the origin at the top-left corner.
    pub fn north_up(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width: cell_size,
            pixel_height: -cell_size,
        }
    }

    /// Fractional (row, col) of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (y - self.origin_y) / self.pixel_height,
            (x - self.origin_x) / self.pixel_width,
        )
    }

    /// World coordinate of a cell centre.
    pub fn pixel_to_world(&self, row: usize, col: usize) -> Point2 {
        Point2::new(
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }
}

/// Row-major grid with an optional no-data marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster<T = f64> {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub nodata: Option<T>,
    #[serde(default)]
    pub crs: Option<String>,
    pub cells: Vec<T>,
}

impl<T: Copy + PartialEq> Raster<T> {
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        cells: Vec<T>,
        nodata: Option<T>,
    ) -> AnalysisResult<Self> {
        let raster = Self {
            width,
            height,
            transform,
            nodata,
            crs: None,
            cells,
        };
        raster.check_shape()?;
        Ok(raster)
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    fn check_shape(&self) -> AnalysisResult<()> {
        let expected = self.width.checked_mul(self.height).ok_or_else(|| {
            AnalysisError::ConfigurationError(format!(
                "Raster dimensions {}x{} overflow",
                self.width, self.height
            ))
        })?;
        if self.cells.len() != expected {
            return Err(AnalysisError::ConfigurationError(format!(
                "Raster has {} cells but declares {}x{}",
                self.cells.len(),
                self.width,
                self.height
            )));
        }
        if !(self.transform.pixel_width.is_finite()
            && self.transform.pixel_height.is_finite()
            && self.transform.cell_area() > 0.0)
        {
            return Err(AnalysisError::ConfigurationError(
                "Raster transform has a degenerate pixel size".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cell_area(&self) -> f64 {
        self.transform.cell_area()
    }

    fn is_nodata(&self, value: T) -> bool {
        self.nodata.is_some_and(|nd| nd == value)
    }

    /// Value at (row, col); `None` out of bounds or at no-data cells.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let value = self.cells[row * self.width + col];
        if self.is_nodata(value) {
            None
        } else {
            Some(value)
        }
    }

    /// Value under a world coordinate.
    pub fn sample(&self, x: f64, y: f64) -> Option<T> {
        let (row, col) = self.transform.world_to_pixel(x, y);
        if !(row.is_finite() && col.is_finite()) || row < 0.0 || col < 0.0 {
            return None;
        }
        self.get(row.floor() as usize, col.floor() as usize)
    }

    /// Every valid cell as (row, col, value), row-major.
    pub fn valid_cells(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, &v)| {
            if self.is_nodata(v) {
                None
            } else {
                Some((i / self.width, i % self.width, v))
            }
        })
    }

    /// World extent covered by the grid.
    pub fn bounds(&self) -> BoundingBox {
        let t = &self.transform;
        let far_x = t.origin_x + self.width as f64 * t.pixel_width;
        let far_y = t.origin_y + self.height as f64 * t.pixel_height;
        BoundingBox {
            min_x: t.origin_x.min(far_x),
            min_y: t.origin_y.min(far_y),
            max_x: t.origin_x.max(far_x),
            max_y: t.origin_y.max(far_y),
        }
    }

    /// Same dimensions and transform as `other`.
    pub fn same_grid<U>(&self, other: &Raster<U>) -> bool {
        self.width == other.width && self.height == other.height && self.transform == other.transform
    }
}

impl<T: Copy + PartialEq + DeserializeOwned> Raster<T> {
    /// Load a raster document. Any read or parse failure is a configuration error.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::ConfigurationError(format!(
                "Failed to read raster {}: {}",
                path.display(),
                e
            ))
        })?;
        let raster = Self::from_json_str(&content).map_err(|e| match e {
            AnalysisError::ConfigurationError(msg) => {
                AnalysisError::ConfigurationError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        log::info!(
            "Loaded {}x{} raster from {}",
            raster.width,
            raster.height,
            path.display()
        );
        Ok(raster)
    }

    pub fn from_json_str(content: &str) -> AnalysisResult<Self> {
        let raster: Raster<T> = serde_json::from_str(content)
            .map_err(|e| AnalysisError::ConfigurationError(format!("Corrupt raster: {}", e)))?;
        raster.check_shape()?;
        Ok(raster)
    }
}
