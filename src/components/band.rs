use std::sync::Arc;

use crate::components::{raster::Raster, DataType};

/// Raster carried under a band name, e.g. a derived `NDVI` band.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBand<T: DataType> {
    name: Arc<str>,
    raster: Raster<T>,
}

impl<T: DataType> NamedBand<T> {
    pub fn new(name: &str, raster: Raster<T>) -> Self {
        Self {
            name: Arc::from(name),
            raster,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raster(&self) -> &Raster<T> {
        &self.raster
    }
}
