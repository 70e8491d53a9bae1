use gdal::{Dataset as GdalDataset, Metadata as GdalMetadata};
use ndarray::Array2;
use std::{path::Path, sync::Arc};

use crate::{
    components::{file::File, transforms::GeoTransform},
    crs_geo::Crs,
    errors::{NdviError, Result},
};

/// Band file opened through GDAL, for formats the tiff backend can not decode.
#[derive(Debug, Clone)]
pub struct GdalFile {
    path: Arc<Path>,
    description: String,
    shape: (usize, usize),
    transform: GeoTransform,
    crs: Crs,
    num_bands: usize,
}

impl File for GdalFile {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset = GdalDataset::open(&path)?;
        let (width, height) = dataset.raster_size();
        let crs = crs_of(dataset.spatial_ref()?.auth_code().ok(), dataset.projection())?;
        Ok(GdalFile {
            path: Arc::from(path.as_ref()),
            description: dataset.description()?,
            shape: (height, width),
            transform: GeoTransform::from_gdal(dataset.geo_transform()?),
            crs,
            num_bands: dataset.raster_count(),
        })
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn shape(&self) -> (usize, usize) {
        self.shape
    }

    fn crs(&self) -> Crs {
        self.crs.clone()
    }

    fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn num_bands(&self) -> usize {
        self.num_bands
    }

    fn read_band(&self, index: usize) -> Result<Array2<u16>> {
        if index >= self.num_bands {
            return Err(NdviError::Malformed {
                kind: "raster file",
                reason: format!("{}: band {index} out of range", self.description),
            });
        }
        let dataset = GdalDataset::open(&self.path)?;
        let rasterband = dataset.rasterband(index + 1)?;
        let window = (self.shape.1, self.shape.0);
        let buffer = rasterband.read_as::<u16>((0, 0), window, window, None)?;
        Ok(Array2::from_shape_vec(self.shape, buffer.data().to_vec())?)
    }
}

/// EPSG code of the dataset, WKT without an authority code is not handled.
fn crs_of(auth_code: Option<i32>, projection: String) -> Result<Crs> {
    match auth_code {
        Some(code) if code > 0 => Ok(Crs::from_epsg(code as u32)),
        _ => Err(NdviError::UnsupportedCrs(projection)),
    }
}
