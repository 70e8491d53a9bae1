use geo::MultiPolygon;
use ndarray::Zip;

use crate::{
    components::raster::Raster,
    errors::{NdviError, Result},
    pipeline::composite::AnnualComposite,
};

/// Change of a year's composite against the baseline year, clipped to the region.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceLayer {
    pub year: i32,
    pub baseline_year: i32,
    pub raster: Raster<f64>,
}

impl DifferenceLayer {
    pub fn name(&self) -> String {
        format!("NDVI Difference {} to {}", self.baseline_year, self.year)
    }
}

/// `current - baseline` per pixel. No-data on either side stays no-data.
pub fn difference(current: &Raster<f64>, baseline: &Raster<f64>) -> Result<Raster<f64>> {
    if !current.same_grid(baseline) {
        return Err(NdviError::Malformed {
            kind: "raster",
            reason: "composites do not share a grid".into(),
        });
    }
    Ok(Raster::new(
        Zip::from(current.data())
            .and(baseline.data())
            .par_map_collect(|current, baseline| current - baseline),
        *current.transform(),
        current.crs().clone(),
    ))
}

/// One layer per year after `baseline_year`, in year order.
pub fn yearly_differences(
    composites: &[AnnualComposite],
    baseline_year: i32,
    region: &MultiPolygon,
) -> Result<Vec<DifferenceLayer>> {
    let baseline = composites
        .iter()
        .find(|composite| composite.year == baseline_year)
        .ok_or_else(|| {
            NdviError::configuration(format!("no composite for baseline year {baseline_year}"))
        })?;
    composites
        .iter()
        .filter(|composite| composite.year > baseline_year)
        .map(|composite| {
            Ok(DifferenceLayer {
                year: composite.year,
                baseline_year,
                raster: difference(&composite.ndvi, &baseline.ndvi)?.clip(region),
            })
        })
        .collect()
}
