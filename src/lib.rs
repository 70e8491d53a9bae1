mod calendar;
mod components;
mod config;
mod crs_geo;
mod errors;
mod intersection;
mod scene;

pub mod pipeline;
pub mod render;
pub mod sensors;
pub mod source;

#[cfg(test)]
mod test_utils;

pub use calendar::{CalendarField, CalendarFilter, CalendarRange};
pub use components::{
    band::NamedBand,
    bounds::{GeoBounds, GridSpec, METERS_PER_DEGREE},
    file::File,
    files::{self, FileBackend},
    raster::{Raster, Sampler},
    transforms::{GeoTransform, PixelTransform},
    DataType,
};
pub use config::{
    AnalysisConfig, ChartConfig, ExportConfig, ExportGranularity, MapConfig, PeriodConfig,
    RegionConfig, RegionName, SensorConfig, SourcesConfig, VisParams, WorkflowConfig,
};
pub use crs_geo::{Crs, CrsGeometry};
pub use errors::{DataGap, ExportError, NdviError, Result};
pub use intersection::Intersection;
pub use pipeline::{Workflow, WorkflowOutput};
pub use scene::{IndexedScene, MaskedScene, Scene, SceneRef};
