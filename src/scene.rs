use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use std::collections::BTreeMap;

use crate::{
    components::{band::NamedBand, bounds::GeoBounds, raster::Raster},
    errors::{NdviError, Result},
};

/// Archived scene without its pixels, ordered by acquisition date then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SceneRef {
    pub acquired: NaiveDate,
    pub id: String,
}

impl SceneRef {
    pub fn new(id: impl Into<String>, acquired: NaiveDate) -> Self {
        Self {
            acquired,
            id: id.into(),
        }
    }

    pub fn year(&self) -> i32 {
        self.acquired.year()
    }
}

/// One acquisition: spectral bands and its quality band on a shared grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    id: String,
    acquired: NaiveDate,
    bands: BTreeMap<String, Raster<u16>>,
    footprint: GeoBounds,
    shape: (usize, usize),
}

impl Scene {
    pub fn new(
        id: impl Into<String>,
        acquired: NaiveDate,
        bands: impl IntoIterator<Item = (String, Raster<u16>)>,
    ) -> Result<Self> {
        let id = id.into();
        let bands: BTreeMap<String, Raster<u16>> = bands.into_iter().collect();
        let Some(first) = bands.values().next() else {
            return Err(NdviError::Malformed {
                kind: "scene",
                reason: format!("{id} has no bands"),
            });
        };
        if !bands.values().all(|band| band.same_grid(first)) {
            return Err(NdviError::GridMismatch { scene: id });
        }
        let (footprint, shape) = (first.bounds(), first.shape());
        Ok(Self {
            id,
            acquired,
            bands,
            footprint,
            shape,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn acquired(&self) -> NaiveDate {
        self.acquired
    }

    pub fn reference(&self) -> SceneRef {
        SceneRef::new(self.id.clone(), self.acquired)
    }

    pub fn band(&self, name: &str) -> Result<&Raster<u16>> {
        self.bands.get(name).ok_or_else(|| NdviError::MissingBand {
            scene: self.id.clone(),
            band: name.into(),
        })
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// Keeps only `names`, failing if one is missing.
    pub fn select(mut self, names: &[String]) -> Result<Self> {
        if let Some(missing) = names.iter().find(|name| !self.bands.contains_key(*name)) {
            return Err(NdviError::MissingBand {
                scene: self.id,
                band: missing.clone(),
            });
        }
        self.bands.retain(|name, _| names.contains(name));
        Ok(self)
    }

    /// Bounds shared by every band.
    pub fn footprint(&self) -> &GeoBounds {
        &self.footprint
    }

    /// (rows, cols) shared by every band.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }
}

/// [Scene] with its per pixel validity, `true` where the pixel is usable.
#[derive(Debug, Clone)]
pub struct MaskedScene {
    scene: Scene,
    valid: Array2<bool>,
}

impl MaskedScene {
    pub fn new(scene: Scene, valid: Array2<bool>) -> Result<Self> {
        if valid.dim() != scene.shape() {
            return Err(NdviError::GridMismatch {
                scene: scene.id.clone(),
            });
        }
        Ok(Self { scene, valid })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn valid(&self) -> &Array2<bool> {
        &self.valid
    }

    pub fn valid_fraction(&self) -> f64 {
        let total = self.valid.len();
        if total == 0 {
            return 0.;
        }
        self.valid.iter().filter(|valid| **valid).count() as f64 / total as f64
    }
}

/// Derived index band of a scene whose source bands were released.
#[derive(Debug, Clone)]
pub struct IndexedScene {
    reference: SceneRef,
    index: NamedBand<f64>,
}

impl IndexedScene {
    pub fn new(reference: SceneRef, index: NamedBand<f64>) -> Self {
        Self { reference, index }
    }

    pub fn reference(&self) -> &SceneRef {
        &self.reference
    }

    pub fn index(&self) -> &NamedBand<f64> {
        &self.index
    }
}
