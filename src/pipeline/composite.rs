use chrono::NaiveDate;
use log::{debug, info, warn};
use ndarray::{Array2, Zip};
use rayon::prelude::*;

use crate::{
    components::{bounds::GridSpec, raster::Raster},
    config::{AnalysisConfig, PeriodConfig},
    errors::{DataGap, NdviError, Result},
    intersection::Intersection,
    pipeline::region::Region,
    scene::{IndexedScene, SceneRef},
};

/// Mean index of one year's growing season scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualComposite {
    pub year: i32,
    pub time_start: NaiveDate,
    pub scene_count: usize,
    pub ndvi: Raster<f64>,
}

impl AnnualComposite {
    pub fn is_empty(&self) -> bool {
        self.ndvi.valid_count() == 0
    }
}

/// Grid over the region bounding box with cells of `analysis.scale` metres.
pub fn analysis_grid(region: &Region, analysis: &AnalysisConfig) -> Result<GridSpec> {
    analysis.crs.ensure_supported()?;
    match region.bounds(&analysis.crs) {
        Some(bounds) => GridSpec::for_scale(bounds, analysis.scale),
        None => Ok(GridSpec::empty(analysis.crs.clone())),
    }
}

/// `raster` on `grid`, resampled unless it already is, `None` when it lies outside the grid.
pub fn fit_to_grid(raster: &Raster<f64>, grid: &GridSpec) -> Result<Option<Raster<f64>>> {
    match grid.bounds().intersection(&raster.bounds()) {
        Err(NdviError::NoIntersection) => return Ok(None),
        Err(err) => return Err(err),
        Ok(_) => {}
    }
    if raster.is_on(grid) {
        Ok(Some(raster.clone()))
    } else {
        raster.resample(grid).map(Some)
    }
}

/// Unweighted per pixel mean of the valid values of the rasters added to it.
#[derive(Debug, Clone)]
pub struct MeanAccumulator {
    grid: GridSpec,
    sum: Array2<f64>,
    count: Array2<u32>,
    added: usize,
    skipped: usize,
}

impl MeanAccumulator {
    pub fn new(grid: &GridSpec) -> Self {
        Self {
            grid: grid.clone(),
            sum: Array2::zeros(grid.shape()),
            count: Array2::zeros(grid.shape()),
            added: 0,
            skipped: 0,
        }
    }

    /// Adds a raster already on the grid, see [fit_to_grid].
    pub fn add(&mut self, raster: &Raster<f64>) -> Result<()> {
        if !raster.is_on(&self.grid) {
            return Err(NdviError::Malformed {
                kind: "raster",
                reason: "composite input is not on the analysis grid".into(),
            });
        }
        Zip::from(&mut self.sum)
            .and(&mut self.count)
            .and(raster.data())
            .par_for_each(|sum, count, value| {
                if !value.is_nan() {
                    *sum += value;
                    *count += 1;
                }
            });
        self.added += 1;
        Ok(())
    }

    /// Records an input that did not overlap the grid.
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn added(&self) -> usize {
        self.added
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> Result<Raster<f64>> {
        let mean = Zip::from(&self.sum)
            .and(&self.count)
            .par_map_collect(|&sum, &count| {
                if count > 0 {
                    sum / count as f64
                } else {
                    f64::NAN
                }
            });
        Raster::on_grid(&self.grid, mean)
    }
}

/// One composite per year of the period, in year order.
///
/// Years are built one after the other. Within a year, `index` runs on batches of one scene per
/// worker thread and each batch is folded into the running mean before the next one is loaded,
/// in scene order.
///
/// Years without scenes, whose scenes miss the grid, or whose scenes are fully masked yield an
/// all no-data composite and a [DataGap].
pub fn annual_composites<F>(
    scenes: &[SceneRef],
    index: F,
    grid: &GridSpec,
    period: &PeriodConfig,
) -> Result<(Vec<AnnualComposite>, Vec<DataGap>)>
where
    F: Fn(&SceneRef) -> Result<IndexedScene> + Sync,
{
    let batch = rayon::current_num_threads().max(1);
    let mut composites = Vec::new();
    let mut gaps = Vec::new();
    for year in period.years() {
        let yearly = scenes
            .iter()
            .filter(|scene| scene.year() == year)
            .collect::<Vec<_>>();
        let mut mean = MeanAccumulator::new(grid);
        for chunk in yearly.chunks(batch) {
            let fitted = chunk
                .par_iter()
                .map(|scene| fit_to_grid(index(scene)?.index().raster(), grid))
                .collect::<Result<Vec<_>>>()?;
            for (scene, raster) in chunk.iter().zip(fitted) {
                match raster {
                    Some(raster) => mean.add(&raster)?,
                    None => {
                        debug!("{} outside the analysis grid, skipped", scene.id);
                        mean.skip();
                    }
                }
            }
        }
        let (added, skipped) = (mean.added(), mean.skipped());
        let composite = AnnualComposite {
            year,
            time_start: period.time_start(year)?,
            scene_count: yearly.len(),
            ndvi: mean.finish()?,
        };

        let reason = if composite.scene_count == 0 {
            Some("no scenes in season")
        } else if added == 0 {
            Some("no scene overlaps the region")
        } else if composite.is_empty() {
            Some("every pixel masked")
        } else {
            None
        };
        match reason {
            Some(reason) => {
                let gap = DataGap {
                    year,
                    reason: reason.into(),
                };
                warn!("{gap}");
                gaps.push(gap);
            }
            None => info!(
                "{}: composite of {} scenes ({} outside the grid), {} valid cells",
                composite.year,
                composite.scene_count,
                skipped,
                composite.ndvi.valid_count()
            ),
        }
        composites.push(composite);
    }
    Ok((composites, gaps))
}
