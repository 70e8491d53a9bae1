use ndarray::Array2;
use std::{fmt::Debug, path::Path};

use crate::{
    components::{bounds::GeoBounds, raster::Raster, transforms::GeoTransform},
    crs_geo::Crs,
    errors::Result,
};

/// Georeferenced band file. Opening reads headers only, pixels are read on demand.
///
/// Landsat Collection 2 bands, `QA_PIXEL` included, are stored as unsigned 16 bit integers.
pub trait File: Debug + Sized + Send + Sync {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;
    fn description(&self) -> String;
    /// (rows, cols)
    fn shape(&self) -> (usize, usize);
    fn crs(&self) -> Crs;
    fn transform(&self) -> GeoTransform;
    fn num_bands(&self) -> usize;
    fn read_band(&self, index: usize) -> Result<Array2<u16>>;

    fn footprint(&self) -> GeoBounds {
        GeoBounds::of_pixels(&self.transform(), self.shape(), self.crs())
    }

    fn read_raster(&self, index: usize) -> Result<Raster<u16>> {
        Ok(Raster::new(
            self.read_band(index)?,
            self.transform(),
            self.crs(),
        ))
    }
}
