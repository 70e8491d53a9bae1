use geo::{coord, BooleanOps, BoundingRect, MultiPolygon, Rect};
use log::{info, warn};

use crate::{
    components::bounds::GeoBounds,
    config::{RegionConfig, RegionName},
    crs_geo::Crs,
    errors::{NdviError, Result},
    source::{BoundaryDataset, FeatureFilter},
};

/// Administrative feature matched by a configured name pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub name: RegionName,
    pub geometry: MultiPolygon,
}

/// Union of all matched features. Empty when nothing matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    features: Vec<RegionFeature>,
    geometry: MultiPolygon,
}

impl Region {
    pub fn new(features: Vec<RegionFeature>) -> Self {
        let geometry = union(features.iter().map(|feature| &feature.geometry));
        Self { features, geometry }
    }

    pub fn features(&self) -> &[RegionFeature] {
        &self.features
    }

    pub fn geometry(&self) -> &MultiPolygon {
        &self.geometry
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }

    /// Bounding box of the matched features.
    pub fn bounds(&self, crs: &Crs) -> Option<GeoBounds> {
        self.features
            .iter()
            .filter_map(|feature| feature.geometry.bounding_rect())
            .reduce(|lhs, rhs| {
                Rect::new(
                    coord! { x: lhs.min().x.min(rhs.min().x), y: lhs.min().y.min(rhs.min().y) },
                    coord! { x: lhs.max().x.max(rhs.max().x), y: lhs.max().y.max(rhs.max().y) },
                )
            })
            .map(|rect| GeoBounds::new(crs.clone(), rect))
    }
}

/// Resolves every configured (country, region) pair and merges the matches.
pub fn resolve_region(dataset: &dyn BoundaryDataset, config: &RegionConfig) -> Result<Region> {
    let mut features = Vec::new();
    for name in &config.names {
        let filter = FeatureFilter::default()
            .eq(&config.country_key, &name.country)
            .eq(&config.region_key, &name.region);
        let matched = dataset.features(&filter)?;
        if matched.is_empty() {
            if config.require_match {
                return Err(NdviError::configuration(format!(
                    "no boundary feature for {}/{}",
                    name.country, name.region
                )));
            }
            warn!(
                "no boundary feature for {}/{}, it contributes nothing to the region",
                name.country, name.region
            );
        }
        features.extend(matched.into_iter().map(|feature| RegionFeature {
            name: name.clone(),
            geometry: feature.geometry().clone(),
        }));
    }
    let region = Region::new(features);
    if region.is_empty() {
        warn!("region is empty, every downstream result will be empty");
    } else {
        info!("region resolved from {} features", region.features.len());
    }
    Ok(region)
}

/// Union of whole countries, keyed by `country_key`.
pub fn resolve_countries(
    dataset: &dyn BoundaryDataset,
    countries: &[String],
    country_key: &str,
) -> Result<MultiPolygon> {
    let mut geometries = Vec::new();
    for country in countries {
        let matched = dataset.features(&FeatureFilter::default().eq(country_key, country))?;
        if matched.is_empty() {
            warn!("no boundary feature for country {country}");
        }
        geometries.extend(matched.into_iter().map(|feature| feature.geometry().clone()));
    }
    Ok(union(geometries.iter()))
}

fn union<'a>(mut geometries: impl Iterator<Item = &'a MultiPolygon>) -> MultiPolygon {
    let Some(first) = geometries.next() else {
        return MultiPolygon::new(vec![]);
    };
    geometries.fold(first.clone(), |merged, geometry| merged.union(geometry))
}
