use geo::MultiPolygon;
use itertools::Itertools;
use log::info;
use serde::Serialize;
use std::path::Path;

use crate::{
    config::ExportGranularity,
    errors::{NdviError, Result},
    pipeline::{composite::AnnualComposite, reduce::RegionReducer, region::Region},
};

/// Geometry reduced once per year into an export row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFeature {
    pub country: String,
    pub region: String,
    pub geometry: MultiPolygon,
}

/// One csv row: the mean index of a feature for a year. `mean` is empty for gap years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub year: i32,
    pub country: String,
    pub region: String,
    pub mean: Option<f64>,
    pub pixel_count: usize,
}

/// The merged region as a single feature, or each matched feature on its own.
pub fn export_features(region: &Region, granularity: ExportGranularity) -> Vec<ExportFeature> {
    match granularity {
        ExportGranularity::Merged => vec![ExportFeature {
            country: join_unique(region.features().iter().map(|f| f.name.country.as_str())),
            region: join_unique(region.features().iter().map(|f| f.name.region.as_str())),
            geometry: region.geometry().clone(),
        }],
        ExportGranularity::PerFeature => region
            .features()
            .iter()
            .map(|feature| ExportFeature {
                country: feature.name.country.clone(),
                region: feature.name.region.clone(),
                geometry: feature.geometry.clone(),
            })
            .collect(),
    }
}

fn join_unique<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.unique().join("+")
}

/// Rows ordered by year, then by feature.
pub fn export_rows(
    composites: &[AnnualComposite],
    features: &[ExportFeature],
    reducer: &RegionReducer,
) -> Result<Vec<ExportRow>> {
    let mut rows = Vec::with_capacity(composites.len() * features.len());
    for composite in composites {
        for feature in features {
            let reduced = reducer.reduce(&composite.ndvi, &feature.geometry)?;
            rows.push(ExportRow {
                year: composite.year,
                country: feature.country.clone(),
                region: feature.region.clone(),
                mean: reduced.mean,
                pixel_count: reduced.pixel_count,
            });
        }
    }
    Ok(rows)
}

pub const CSV_COLUMNS: [&str; 5] = ["year", "country", "region", "mean", "pixel_count"];

/// Writes the header even when there are no rows.
pub fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| NdviError::export(path, err))?;
    writer
        .write_record(CSV_COLUMNS)
        .map_err(|err| NdviError::export(path, err))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| NdviError::export(path, err))?;
    }
    writer.flush().map_err(|err| NdviError::export(path, err))?;
    info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
