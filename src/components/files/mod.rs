pub mod tiff_backend;

#[cfg(feature = "gdal")]
pub mod gdal_backend;

use std::path::Path;

use crate::{
    components::{bounds::GeoBounds, file::File, raster::Raster},
    errors::Result,
};

/// Reader used for band files listed in a scene manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileBackend {
    #[default]
    Tiff,
    Gdal,
}

impl FileBackend {
    pub fn footprint(&self, path: &Path) -> Result<GeoBounds> {
        match self {
            FileBackend::Tiff => Ok(tiff_backend::TiffFile::open(path)?.footprint()),
            FileBackend::Gdal => gdal_footprint(path),
        }
    }

    pub fn read_raster(&self, path: &Path, index: usize) -> Result<Raster<u16>> {
        match self {
            FileBackend::Tiff => tiff_backend::TiffFile::open(path)?.read_raster(index),
            FileBackend::Gdal => gdal_read_raster(path, index),
        }
    }
}

#[cfg(feature = "gdal")]
fn gdal_footprint(path: &Path) -> Result<GeoBounds> {
    Ok(gdal_backend::GdalFile::open(path)?.footprint())
}

#[cfg(feature = "gdal")]
fn gdal_read_raster(path: &Path, index: usize) -> Result<Raster<u16>> {
    gdal_backend::GdalFile::open(path)?.read_raster(index)
}

#[cfg(not(feature = "gdal"))]
fn gdal_footprint(_path: &Path) -> Result<GeoBounds> {
    Err(gdal_disabled())
}

#[cfg(not(feature = "gdal"))]
fn gdal_read_raster(_path: &Path, _index: usize) -> Result<Raster<u16>> {
    Err(gdal_disabled())
}

#[cfg(not(feature = "gdal"))]
fn gdal_disabled() -> crate::errors::NdviError {
    crate::errors::NdviError::configuration(
        "gdal backend requested but built without the `gdal` feature",
    )
}
