//! Minimal GeoJSON model for line geometries.
//!
//! Only what trackway exchange needs: `FeatureCollection`s whose features are
//! `LineString` or `MultiLineString`. Other geometry types are skipped when
//! reading.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::domain::Trackway;
use crate::core::geometry::{Point2, Polyline};
use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<[f64; 2]> },
    MultiLineString { coordinates: Vec<Vec<[f64; 2]>> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features,
        }
    }

    /// Every line in the collection, multi-lines flattened, in feature order.
    pub fn polylines(&self) -> Vec<Polyline> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(|g| match g {
                Geometry::LineString { coordinates } => vec![to_polyline(coordinates)],
                Geometry::MultiLineString { coordinates } => {
                    coordinates.iter().map(|c| to_polyline(c)).collect()
                }
                Geometry::Unsupported => Vec::new(),
            })
            .filter(|line| line.len() >= 2)
            .collect()
    }
}

fn to_polyline(coordinates: &[[f64; 2]]) -> Polyline {
    Polyline::new(coordinates.iter().map(|&[x, y]| Point2::new(x, y)).collect())
}

/// One `LineString` feature per trackway with its headline metrics.
pub fn trackway_feature(trackway: &Trackway) -> Feature {
    let coordinates = trackway.points.iter().map(|p| [p.x, p.y]).collect();

    let mut properties = Map::new();
    properties.insert("trackway_id".into(), Value::from(trackway.id.0));
    properties.insert("length".into(), Value::from(trackway.length));
    properties.insert("avg_speed".into(), Value::from(trackway.average_speed));
    properties.insert("confidence_mean".into(), Value::from(trackway.confidence_mean));
    properties.insert("point_count".into(), Value::from(trackway.points.len()));
    if let Some(habitat) = trackway.habitat_type {
        properties.insert("habitat_type".into(), Value::from(habitat));
    }
    if let Some(tortuosity) = trackway.tortuosity() {
        properties.insert("tortuosity".into(), Value::from(tortuosity));
    }

    Feature {
        kind: "Feature".to_string(),
        geometry: Some(Geometry::LineString { coordinates }),
        properties,
    }
}

/// Trackways with fewer than two points are left out.
pub fn trackways_to_collection(trackways: &[Trackway]) -> FeatureCollection {
    FeatureCollection::new(
        trackways
            .iter()
            .filter(|t| t.points.len() >= 2)
            .map(trackway_feature)
            .collect(),
    )
}

pub fn parse_feature_collection(content: &str) -> AnalysisResult<FeatureCollection> {
    let collection: FeatureCollection = serde_json::from_str(content)?;
    if collection.kind != "FeatureCollection" {
        return Err(AnalysisError::InvalidInput(format!(
            "Expected a FeatureCollection, found {}",
            collection.kind
        )));
    }
    Ok(collection)
}
