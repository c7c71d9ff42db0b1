//! Habitat correlation.
//!
//! Trackways are assigned the habitat category under their centroid, counted
//! per category and divided by that category's area. Ecological pressure joins
//! the resulting density with the zonal mean of a degradation raster.
//!
//! Category values from both rasters go through [`normalize_category`] before
//! any join, so `1.0` from a float grid and `1` from an integer grid meet on
//! the same key.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{CoordinateUnits, HabitatSettings};
use crate::core::domain::{DetectionPoint, HabitatArea, Trackway};
use crate::core::geometry::{BoundingBox, Point2};
use crate::error::{AnalysisError, AnalysisResult};
use crate::raster::Raster;

/// Trackway density within one habitat category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HabitatImpact {
    pub trackway_count: usize,
    pub area: f64,
    pub density: f64,
}

/// Trackway density joined with the category's mean degradation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcologicalPressure {
    pub trackway_count: usize,
    pub area: f64,
    pub density: f64,
    pub degradation: f64,
}

/// Integer key for a raster category value; `None` for NaN or infinities.
pub fn normalize_category(value: f64) -> Option<i64> {
    if value.is_finite() {
        Some(value.round() as i64)
    } else {
        None
    }
}

/// Area per category: cell count times cell area, ascending by category.
pub fn habitat_areas(habitat: &Raster) -> Vec<HabitatArea> {
    let cell_area = habitat.cell_area();
    habitat
        .valid_cells()
        .filter_map(|(_, _, v)| normalize_category(v))
        .counts()
        .into_iter()
        .sorted()
        .map(|(category, count)| HabitatArea {
            category,
            area: count as f64 * cell_area,
        })
        .collect()
}

/// Habitat category under the trackway centroid.
pub fn habitat_for_trackway(trackway: &Trackway, habitat: &Raster) -> Option<i64> {
    let centroid = trackway.centroid()?;
    habitat
        .sample(centroid.x, centroid.y)
        .and_then(normalize_category)
}

/// Fill `habitat_type` on every trackway from the raster.
pub fn assign_habitats(trackways: &mut [Trackway], habitat: &Raster) {
    for trackway in trackways.iter_mut() {
        trackway.habitat_type = habitat_for_trackway(trackway, habitat);
    }
}

/// Trackways per unit area for each category that holds at least one trackway.
///
/// Trackways without a habitat and categories without positive area are left out.
pub fn habitat_impact(trackways: &[Trackway], areas: &[HabitatArea]) -> BTreeMap<i64, HabitatImpact> {
    let area_by_category: BTreeMap<i64, f64> =
        areas.iter().map(|a| (a.category, a.area)).collect();

    trackways
        .iter()
        .filter_map(|t| t.habitat_type)
        .counts()
        .into_iter()
        .filter_map(|(category, count)| {
            let area = *area_by_category.get(&category)?;
            if area > 0.0 {
                Some((
                    category,
                    HabitatImpact {
                        trackway_count: count,
                        area,
                        density: count as f64 / area,
                    },
                ))
            } else {
                None
            }
        })
        .collect()
}

/// Reject raster pairs that do not describe the same grid in the same CRS.
pub fn check_compatible(habitat: &Raster, degradation: &Raster) -> AnalysisResult<()> {
    if let (Some(a), Some(b)) = (&habitat.crs, &degradation.crs) {
        if a != b {
            return Err(AnalysisError::ConfigurationError(format!(
                "Habitat raster CRS {} does not match degradation raster CRS {}",
                a, b
            )));
        }
    }
    if !habitat.same_grid(degradation) {
        return Err(AnalysisError::ConfigurationError(format!(
            "Habitat raster grid {}x{} does not match degradation raster grid {}x{}",
            habitat.width, habitat.height, degradation.width, degradation.height
        )));
    }
    Ok(())
}

/// Mean degradation over the cells of each habitat category.
pub fn average_degradation(
    habitat: &Raster,
    degradation: &Raster,
) -> AnalysisResult<BTreeMap<i64, f64>> {
    check_compatible(habitat, degradation)?;

    let mut sums: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for (row, col, value) in habitat.valid_cells() {
        let Some(category) = normalize_category(value) else {
            continue;
        };
        let Some(d) = degradation.get(row, col).filter(|d| d.is_finite()) else {
            continue;
        };
        let entry = sums.entry(category).or_insert((0.0, 0));
        entry.0 += d;
        entry.1 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|(category, (sum, n))| (category, sum / n as f64))
        .collect())
}

/// Join habitat impact with zonal degradation.
///
/// Categories present in the impact map but without any degradation cells are dropped.
pub fn ecological_pressure(
    trackways: &[Trackway],
    habitat: &Raster,
    degradation: &Raster,
) -> AnalysisResult<BTreeMap<i64, EcologicalPressure>> {
    let degradation_by_category = average_degradation(habitat, degradation)?;
    let impact = habitat_impact(trackways, &habitat_areas(habitat));

    Ok(impact
        .into_iter()
        .filter_map(|(category, i)| {
            degradation_by_category
                .get(&category)
                .map(|&degradation| {
                    (
                        category,
                        EcologicalPressure {
                            trackway_count: i.trackway_count,
                            area: i.area,
                            density: i.density,
                            degradation,
                        },
                    )
                })
        })
        .collect())
}

/// Habitat and degradation rasters loaded once and shared between analyses.
#[derive(Debug, Clone)]
pub struct HabitatCorrelator {
    habitat: Arc<Raster>,
    degradation: Option<Arc<Raster>>,
}

impl HabitatCorrelator {
    pub fn new(habitat: Arc<Raster>, degradation: Option<Arc<Raster>>) -> AnalysisResult<Self> {
        if let Some(d) = &degradation {
            check_compatible(&habitat, d)?;
        }
        Ok(Self {
            habitat,
            degradation,
        })
    }

    /// Load the rasters named in the configuration.
    pub fn from_settings(settings: &HabitatSettings) -> AnalysisResult<Self> {
        let habitat_path = settings.habitat_raster.as_ref().ok_or_else(|| {
            AnalysisError::ConfigurationError("habitat.habitat_raster is not set".to_string())
        })?;
        let habitat = Arc::new(Raster::from_json_file(habitat_path)?);
        let degradation = match &settings.degradation_raster {
            Some(path) => Some(Arc::new(Raster::from_json_file(path)?)),
            None => None,
        };
        Self::new(habitat, degradation)
    }

    pub fn habitat(&self) -> &Raster {
        &self.habitat
    }

    /// Reject rasters whose georeferencing cannot describe coordinates in `units`.
    ///
    /// Projected detections need rasters that carry a CRS; pixel detections
    /// cannot be joined with a raster that carries one.
    pub fn check_units(&self, units: CoordinateUnits) -> AnalysisResult<()> {
        let rasters = std::iter::once(("habitat", &self.habitat))
            .chain(self.degradation.iter().map(|d| ("degradation", d)));
        for (name, raster) in rasters {
            match (units, &raster.crs) {
                (CoordinateUnits::Pixel, Some(crs)) => {
                    return Err(AnalysisError::ConfigurationError(format!(
                        "Detections are in pixel coordinates but the {} raster is in {}",
                        name, crs
                    )));
                }
                (CoordinateUnits::Projected, None) => {
                    return Err(AnalysisError::ConfigurationError(format!(
                        "Detections are in projected coordinates but the {} raster has no CRS",
                        name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Reject detections whose extent lies entirely outside the habitat raster.
    ///
    /// An empty set of detections passes.
    pub fn check_coverage(&self, points: &[DetectionPoint]) -> AnalysisResult<()> {
        let positions: Vec<Point2> = points.iter().map(|p| p.position()).collect();
        let Some(extent) = BoundingBox::from_points(&positions) else {
            return Ok(());
        };
        let bounds = self.habitat.bounds();
        if extent.intersects(&bounds) {
            Ok(())
        } else {
            Err(AnalysisError::ConfigurationError(format!(
                "Detections span x {}..{}, y {}..{} but the habitat raster covers x {}..{}, y {}..{}",
                extent.min_x,
                extent.max_x,
                extent.min_y,
                extent.max_y,
                bounds.min_x,
                bounds.max_x,
                bounds.min_y,
                bounds.max_y
            )))
        }
    }

    pub fn areas(&self) -> Vec<HabitatArea> {
        habitat_areas(&self.habitat)
    }

    pub fn assign(&self, trackways: &mut [Trackway]) {
        assign_habitats(trackways, &self.habitat);
    }

    pub fn impact(&self, trackways: &[Trackway]) -> BTreeMap<i64, HabitatImpact> {
        habitat_impact(trackways, &self.areas())
    }

    pub fn pressure(&self, trackways: &[Trackway]) -> AnalysisResult<BTreeMap<i64, EcologicalPressure>> {
        let degradation = self.degradation.as_ref().ok_or_else(|| {
            AnalysisError::ConfigurationError("habitat.degradation_raster is not set".to_string())
        })?;
        ecological_pressure(trackways, &self.habitat, degradation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{Autocorrelation, DetectionPoint, TrackwayId};
    use crate::raster::GeoTransform;
    use chrono::{TimeZone, Utc};

    fn habitat_grid() -> Raster {
        // 20 x 2 grid: top row category 1, bottom row category 3.
        let mut cells = vec![1.0; 20];
        cells.extend(vec![3.0; 20]);
        Raster::new(20, 2, GeoTransform::north_up(0.0, 2.0, 1.0), cells, None).unwrap()
    }

    fn degradation_grid() -> Raster {
        let mut cells = vec![0.1; 20];
        cells.extend(vec![0.5; 20]);
        Raster::new(20, 2, GeoTransform::north_up(0.0, 2.0, 1.0), cells, None).unwrap()
    }

    fn trackway_through(points: &[(f64, f64)]) -> Trackway {
        let points: Vec<DetectionPoint> = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                DetectionPoint::new(Utc.timestamp_opt(60 * i as i64, 0).unwrap(), x, y, 0.9, "deer")
            })
            .collect();
        Trackway {
            id: TrackwayId(0),
            points,
            length: 0.0,
            average_speed: 0.0,
            confidence_mean: 0.9,
            confidence_std: 0.0,
            spatial_autocorrelation: Autocorrelation::unavailable(),
            habitat_type: None,
            behavior: None,
            edge_distance: None,
        }
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(1.0), Some(1));
        assert_eq!(normalize_category(2.6), Some(3));
        assert_eq!(normalize_category(f64::NAN), None);
    }

    #[test]
    fn test_areas() {
        let areas = habitat_areas(&habitat_grid());
        assert_eq!(
            areas,
            vec![
                HabitatArea { category: 1, area: 20.0 },
                HabitatArea { category: 3, area: 20.0 },
            ]
        );
    }

    #[test]
    fn test_density_single_trackway() {
        let habitat = habitat_grid();
        let mut trackways = vec![trackway_through(&[
            (0.5, 1.5),
            (3.5, 1.5),
            (6.5, 1.5),
            (9.5, 1.5),
            (12.5, 1.5),
        ])];
        assign_habitats(&mut trackways, &habitat);
        assert_eq!(trackways[0].habitat_type, Some(1));

        let impact = habitat_impact(&trackways, &habitat_areas(&habitat));
        assert_eq!(impact.len(), 1);
        assert_eq!(impact[&1].trackway_count, 1);
        assert_eq!(impact[&1].area, 20.0);
        assert_eq!(impact[&1].density, 0.05);
    }

    #[test]
    fn test_outside_raster_has_no_habitat() {
        let t = trackway_through(&[(100.0, 100.0), (110.0, 100.0)]);
        assert_eq!(habitat_for_trackway(&t, &habitat_grid()), None);
    }

    #[test]
    fn test_ecological_pressure() {
        let habitat = habitat_grid();
        let mut trackways = vec![trackway_through(&[(0.5, 1.5), (12.5, 1.5)])];
        assign_habitats(&mut trackways, &habitat);

        let pressure = ecological_pressure(&trackways, &habitat, &degradation_grid()).unwrap();
        assert_eq!(pressure.len(), 1);
        assert!((pressure[&1].degradation - 0.1).abs() < 1e-12);
        assert_eq!(pressure[&1].density, 0.05);

        let zonal = average_degradation(&habitat, &degradation_grid()).unwrap();
        assert!((zonal[&3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_crs_mismatch_is_configuration_error() {
        let habitat = habitat_grid().with_crs("EPSG:32633");
        let degradation = degradation_grid().with_crs("EPSG:4326");
        assert!(matches!(
            average_degradation(&habitat, &degradation),
            Err(AnalysisError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_units_must_match_raster_crs() {
        let projected = HabitatCorrelator::new(Arc::new(habitat_grid().with_crs("EPSG:32633")), None).unwrap();
        assert!(projected.check_units(CoordinateUnits::Projected).is_ok());
        assert!(matches!(
            projected.check_units(CoordinateUnits::Pixel),
            Err(AnalysisError::ConfigurationError(_))
        ));

        let bare = HabitatCorrelator::new(Arc::new(habitat_grid()), None).unwrap();
        assert!(bare.check_units(CoordinateUnits::Pixel).is_ok());
        assert!(matches!(
            bare.check_units(CoordinateUnits::Projected),
            Err(AnalysisError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_coverage() {
        let correlator = HabitatCorrelator::new(Arc::new(habitat_grid()), None).unwrap();
        let inside = trackway_through(&[(0.5, 1.5), (30.0, 1.5)]);
        let outside = trackway_through(&[(100.0, 100.0), (110.0, 100.0)]);
        assert!(correlator.check_coverage(&inside.points).is_ok());
        assert!(correlator.check_coverage(&[]).is_ok());
        assert!(matches!(
            correlator.check_coverage(&outside.points),
            Err(AnalysisError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_grid_mismatch_is_configuration_error() {
        let small = Raster::new(1, 1, GeoTransform::north_up(0.0, 2.0, 1.0), vec![0.2], None).unwrap();
        let result = HabitatCorrelator::new(Arc::new(habitat_grid()), Some(Arc::new(small)));
        assert!(matches!(result, Err(AnalysisError::ConfigurationError(_))));
    }
}
