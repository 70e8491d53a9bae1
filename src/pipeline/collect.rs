use log::{info, warn};

use crate::{
    config::{PeriodConfig, SensorConfig},
    errors::Result,
    pipeline::region::Region,
    source::{SceneArchive, SceneQuery, SceneRef},
};

/// Scenes intersecting the region inside the configured years and growing season months.
pub fn collect_scenes(
    archive: &dyn SceneArchive,
    region: &Region,
    period: &PeriodConfig,
    sensor: &SensorConfig,
) -> Result<Vec<SceneRef>> {
    let query = SceneQuery {
        region: region.geometry().clone(),
        filter: period.calendar_filter()?,
        bands: sensor.bands(),
    };
    if region.is_empty() {
        warn!("empty region, no scene can intersect it");
        return Ok(Vec::new());
    }
    let scenes = archive.find(&query)?;
    info!(
        "collected {} {} scenes for {}..={}, months {}..={}",
        scenes.len(),
        sensor.collection,
        period.start_year,
        period.end_year,
        period.start_month,
        period.end_month
    );
    Ok(scenes)
}
