//! The NDVI trend workflow, stage by stage.
//!
//! region -> collect -> (load -> cloud -> index) per scene -> composite
//!        -> {difference, chart, export}

pub mod chart;
pub mod cloud;
pub mod collect;
pub mod composite;
pub mod difference;
pub mod export;
pub mod index;
pub mod reduce;
pub mod region;

use geo::MultiPolygon;
use log::{info, warn};
use std::{fs, path::Path};

use crate::{
    components::bounds::GridSpec,
    config::WorkflowConfig,
    errors::{DataGap, NdviError, Result},
    render::{viewport, MapLayer, MapManifest},
    source::{BoundaryDataset, SceneArchive},
};
use chart::TimeSeries;
use composite::AnnualComposite;
use difference::DifferenceLayer;
use export::ExportRow;
use reduce::RegionReducer;
use region::Region;

/// Wires the configured stages to the injected boundary dataset and scene archive.
#[derive(Debug)]
pub struct Workflow<'a> {
    config: WorkflowConfig,
    boundaries: &'a dyn BoundaryDataset,
    archive: &'a dyn SceneArchive,
}

/// Everything the workflow computes, before anything is written.
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    pub region: Region,
    /// Union of the background countries.
    pub background: MultiPolygon,
    pub grid: GridSpec,
    pub composites: Vec<AnnualComposite>,
    pub differences: Vec<DifferenceLayer>,
    pub series: TimeSeries,
    pub rows: Vec<ExportRow>,
    /// Years without usable data, reported but not fatal.
    pub gaps: Vec<DataGap>,
}

impl<'a> Workflow<'a> {
    pub fn new(
        config: WorkflowConfig,
        boundaries: &'a dyn BoundaryDataset,
        archive: &'a dyn SceneArchive,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            boundaries,
            archive,
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn run(&self) -> Result<WorkflowOutput> {
        let config = &self.config;
        let reducer = RegionReducer::from_config(&config.analysis)?;

        let region = region::resolve_region(self.boundaries, &config.region)?;
        let background = region::resolve_countries(
            self.boundaries,
            &config.map.background_countries,
            &config.region.country_key,
        )?;

        let scenes = collect::collect_scenes(self.archive, &region, &config.period, &config.sensor)?;
        let indexer = index::scene_indexer(self.archive, &config.sensor)?;

        let grid = composite::analysis_grid(&region, &config.analysis)?;
        let (composites, gaps) =
            composite::annual_composites(&scenes, indexer, &grid, &config.period)?;

        let differences = difference::yearly_differences(
            &composites,
            config.period.baseline_year(),
            region.geometry(),
        )?;
        let series = TimeSeries::new(&composites, region.geometry(), &reducer, &config.chart)?;
        let features = export::export_features(&region, config.export.granularity);
        let rows = export::export_rows(&composites, &features, &reducer)?;
        info!(
            "{} composites, {} difference layers, {} export rows, {} gaps",
            composites.len(),
            differences.len(),
            rows.len(),
            gaps.len()
        );

        Ok(WorkflowOutput {
            region,
            background,
            grid,
            composites,
            differences,
            series,
            rows,
            gaps,
        })
    }
}

impl WorkflowOutput {
    /// Writes the csv table, the chart and the map layers into `out_dir`.
    pub fn write(&self, out_dir: &Path, config: &WorkflowConfig) -> Result<()> {
        fs::create_dir_all(out_dir).map_err(|err| NdviError::export(out_dir, err))?;
        export::write_csv(&out_dir.join(config.export.file_name()), &self.rows)?;
        self.series.write(out_dir, &config.chart)?;
        self.write_map(out_dir, config)
    }

    fn write_map(&self, out_dir: &Path, config: &WorkflowConfig) -> Result<()> {
        let Some(bounds) = self.region.bounds(&config.analysis.crs) else {
            warn!("empty region, no map layers written");
            return Ok(());
        };
        let viewport = viewport(&bounds, &config.map)?;
        let background = (!self.background.0.is_empty())
            .then(|| MapLayer::background(&self.background, &viewport, &config.map));
        let layers = self
            .differences
            .iter()
            .map(|layer| {
                MapLayer::new(
                    layer.name(),
                    layer.raster.clone(),
                    config.map.difference.clone(),
                )
            })
            .collect::<Vec<_>>();
        MapManifest::write(
            out_dir,
            background.as_ref(),
            &layers,
            &viewport,
            bounds.rect().center(),
            &config.map,
        )?;
        Ok(())
    }
}
