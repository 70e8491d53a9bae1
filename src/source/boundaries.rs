use geo::{Coord, LineString, MultiPolygon, Polygon};
use log::{debug, info};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, io::BufReader, path::Path};

use super::BoundaryDataset;
use crate::errors::{NdviError, Result};

/// One administrative unit, e.g. a GAUL level 1 feature.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminFeature {
    properties: BTreeMap<String, String>,
    geometry: MultiPolygon,
}

impl AdminFeature {
    pub fn new<'a>(
        properties: impl IntoIterator<Item = (&'a str, &'a str)>,
        geometry: MultiPolygon,
    ) -> Self {
        Self {
            properties: properties
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            geometry,
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn geometry(&self) -> &MultiPolygon {
        &self.geometry
    }
}

/// Conjunction of property equalities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFilter(Vec<(String, String)>);

impl FeatureFilter {
    pub fn eq(mut self, key: &str, value: &str) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn matches(&self, feature: &AdminFeature) -> bool {
        self.0
            .iter()
            .all(|(key, value)| feature.property(key) == Some(value.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBoundaries(Vec<AdminFeature>);

impl InMemoryBoundaries {
    pub fn new(features: Vec<AdminFeature>) -> Self {
        Self(features)
    }
}

impl BoundaryDataset for InMemoryBoundaries {
    fn features(&self, filter: &FeatureFilter) -> Result<Vec<AdminFeature>> {
        Ok(self
            .0
            .iter()
            .filter(|feature| filter.matches(feature))
            .cloned()
            .collect())
    }
}

/// Boundaries loaded from a GeoJSON `FeatureCollection` of (multi)polygons.
#[derive(Debug, Clone)]
pub struct GeoJsonBoundaries(InMemoryBoundaries);

impl GeoJsonBoundaries {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(fs::File::open(&path)?);
        let collection: FeatureCollection = serde_json::from_reader(reader)?;
        let boundaries = Self::from_collection(collection)?;
        info!(
            "loaded {} boundary features from {}",
            boundaries.0.0.len(),
            path.as_ref().display()
        );
        Ok(boundaries)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_collection(serde_json::from_str(json)?)
    }

    fn from_collection(collection: FeatureCollection) -> Result<Self> {
        let mut features = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let geometry = match feature.geometry {
                Some(Geometry::Polygon { coordinates }) => {
                    MultiPolygon::new(vec![polygon(coordinates)?])
                }
                Some(Geometry::MultiPolygon { coordinates }) => MultiPolygon::new(
                    coordinates
                        .into_iter()
                        .map(polygon)
                        .collect::<Result<_>>()?,
                ),
                Some(Geometry::Other) | None => {
                    debug!("skipping feature {index} without polygon geometry");
                    continue;
                }
            };
            let properties = feature
                .properties
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(key, value)| match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(value) => Some((key, value)),
                    other => Some((key, other.to_string())),
                })
                .collect();
            features.push(AdminFeature {
                properties,
                geometry,
            });
        }
        Ok(Self(InMemoryBoundaries(features)))
    }
}

impl BoundaryDataset for GeoJsonBoundaries {
    fn features(&self, filter: &FeatureFilter) -> Result<Vec<AdminFeature>> {
        self.0.features(filter)
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Other,
}

fn polygon(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon> {
    let mut rings = rings.into_iter().map(ring);
    let exterior = rings.next().unwrap_or_else(|| Ok(LineString::new(vec![])))?;
    Ok(Polygon::new(exterior, rings.collect::<Result<_>>()?))
}

fn ring(positions: Vec<Vec<f64>>) -> Result<LineString> {
    positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(NdviError::Malformed {
                kind: "geojson",
                reason: format!("position {position:?} needs two coordinates"),
            }),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}
