//! Read-only inputs of the workflow: administrative boundaries and the scene archive.

mod archive;
mod boundaries;

pub use archive::{BandSource, InMemoryArchive, ManifestArchive, ManifestEntry, SceneManifest};
pub use boundaries::{AdminFeature, FeatureFilter, GeoJsonBoundaries, InMemoryBoundaries};
pub use crate::scene::SceneRef;

use chrono::NaiveDate;
use geo::{Intersects, MultiPolygon};
use std::fmt::Debug;

use crate::{
    calendar::CalendarFilter, components::bounds::GeoBounds, errors::Result, scene::Scene,
};

/// Administrative polygons keyed by their properties.
pub trait BoundaryDataset: Debug + Send + Sync {
    fn features(&self, filter: &FeatureFilter) -> Result<Vec<AdminFeature>>;
}

/// Satellite scenes queryable by geometry, acquisition date and band names.
///
/// `find` lists the matching scenes ordered by acquisition date then id without reading pixels,
/// `load` reads one of them carrying only the requested bands.
pub trait SceneArchive: Debug + Send + Sync {
    fn find(&self, query: &SceneQuery) -> Result<Vec<SceneRef>>;

    fn load(&self, scene: &SceneRef, bands: &[String]) -> Result<Scene>;
}

#[derive(Debug, Clone)]
pub struct SceneQuery {
    pub region: MultiPolygon,
    pub filter: CalendarFilter,
    pub bands: Vec<String>,
}

impl SceneQuery {
    /// Whether a scene acquired on `acquired` and covering `footprint` belongs to the result.
    ///
    /// Footprints outside EPSG:4326 are an error, not a miss.
    pub fn admits(&self, acquired: NaiveDate, footprint: &GeoBounds) -> Result<bool> {
        if !self.filter.matches(acquired) {
            return Ok(false);
        }
        footprint.crs().ensure_supported()?;
        Ok(self.region.intersects(&footprint.rect()))
    }
}
