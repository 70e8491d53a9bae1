use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    components::{
        bounds::{GeoBounds, GridSpec},
        raster::Raster,
    },
    config::AnalysisConfig,
    crs_geo::Crs,
    errors::{NdviError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionMean {
    pub mean: Option<f64>,
    pub pixel_count: usize,
}

/// Mean of a raster over a geometry, sampled at a nominal scale.
///
/// Samples sit at the cell centres of a grid over the geometry bounding box; those inside the
/// geometry that hit valid pixels are averaged.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionReducer {
    scale: f64,
    crs: Crs,
}

impl RegionReducer {
    pub fn new(scale: f64, crs: Crs) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.) {
            return Err(NdviError::configuration(format!(
                "reducer scale must be positive, got {scale}"
            )));
        }
        crs.ensure_supported()
            .map_err(|err| NdviError::configuration(err.to_string()))?;
        Ok(Self { scale, crs })
    }

    pub fn from_config(analysis: &AnalysisConfig) -> Result<Self> {
        Self::new(analysis.scale, analysis.crs.clone())
    }

    pub fn reduce(&self, raster: &Raster<f64>, geometry: &MultiPolygon) -> Result<RegionMean> {
        if raster.crs() != &self.crs {
            return Err(NdviError::UnsupportedCrs(format!(
                "{} (expected {})",
                raster.crs(),
                self.crs
            )));
        }
        let Some(rect) = geometry.bounding_rect() else {
            return Ok(RegionMean {
                mean: None,
                pixel_count: 0,
            });
        };
        let grid = GridSpec::for_scale(GeoBounds::new(self.crs.clone(), rect), self.scale)?;
        let sampler = raster.sampler()?;
        let (rows, cols) = grid.shape();
        let partials = (0..rows)
            .into_par_iter()
            .map(|row| {
                (0..cols)
                    .map(|col| grid.cell_center(row, col))
                    .filter(|center| geometry.contains(&Point::from(*center)))
                    .filter_map(|center| sampler.sample(center))
                    .filter(|value| !value.is_nan())
                    .fold((0., 0usize), |(sum, count), value| (sum + value, count + 1))
            })
            .collect::<Vec<_>>();
        let (sum, pixel_count) = partials
            .into_iter()
            .fold((0., 0), |(sum, count), (row_sum, row_count)| {
                (sum + row_sum, count + row_count)
            });
        Ok(RegionMean {
            mean: (pixel_count > 0).then(|| sum / pixel_count as f64),
            pixel_count,
        })
    }
}
