use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fs, ops::RangeInclusive, path::Path, path::PathBuf};

use crate::{
    calendar::{CalendarFilter, CalendarRange},
    components::files::FileBackend,
    crs_geo::Crs,
    errors::{NdviError, Result},
    render::parse_color,
    sensors::{Landsat8, Sensor},
};

/// Every tunable of the workflow. [Default] reproduces the Punjab and Haryana rice season study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    pub sources: SourcesConfig,
    pub region: RegionConfig,
    pub period: PeriodConfig,
    pub sensor: SensorConfig,
    pub analysis: AnalysisConfig,
    pub map: MapConfig,
    pub chart: ChartConfig,
    pub export: ExportConfig,
}

impl WorkflowConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.region.validate()?;
        self.period.validate()?;
        self.sensor.validate()?;
        self.analysis.validate()?;
        self.map.validate()?;
        self.chart.validate()?;
        self.export.validate()
    }
}

/// Input locations, overridable from the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub boundaries: Option<PathBuf>,
    pub scenes: Option<PathBuf>,
    pub backend: FileBackend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionName {
    pub country: String,
    pub region: String,
}

impl RegionName {
    pub fn new(country: &str, region: &str) -> Self {
        Self {
            country: country.into(),
            region: region.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionConfig {
    pub names: Vec<RegionName>,
    /// Feature property holding the country name.
    pub country_key: String,
    /// Feature property holding the first level region name.
    pub region_key: String,
    /// Fail instead of warning when a name matches no feature.
    pub require_match: bool,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            names: vec![
                RegionName::new("India", "Punjab"),
                RegionName::new("India", "Haryana"),
            ],
            country_key: "ADM0_NAME".into(),
            region_key: "ADM1_NAME".into(),
            require_match: false,
        }
    }
}

impl RegionConfig {
    fn validate(&self) -> Result<()> {
        if self.names.is_empty() {
            return Err(NdviError::configuration("region.names is empty"));
        }
        if let Some(name) = self
            .names
            .iter()
            .find(|name| name.country.trim().is_empty() || name.region.trim().is_empty())
        {
            return Err(NdviError::configuration(format!(
                "blank region name {name:?}"
            )));
        }
        if self.country_key.is_empty() || self.region_key.is_empty() {
            return Err(NdviError::configuration("region property keys must be set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeriodConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub start_month: u32,
    pub end_month: u32,
    /// Defaults to `start_year`.
    pub baseline_year: Option<i32>,
    /// Month and day each annual composite is stamped with.
    pub time_start_month: u32,
    pub time_start_day: u32,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            start_year: 2018,
            end_year: 2023,
            start_month: 6,
            end_month: 10,
            baseline_year: None,
            time_start_month: 6,
            time_start_day: 1,
        }
    }
}

impl PeriodConfig {
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    pub fn baseline_year(&self) -> i32 {
        self.baseline_year.unwrap_or(self.start_year)
    }

    pub fn time_start(&self, year: i32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.time_start_month, self.time_start_day).ok_or_else(
            || {
                NdviError::configuration(format!(
                    "{year}-{:02}-{:02} is not a date",
                    self.time_start_month, self.time_start_day
                ))
            },
        )
    }

    /// Acquisition dates in `[start_year, end_year]` and `[start_month, end_month]`.
    pub fn calendar_filter(&self) -> Result<CalendarFilter> {
        Ok(CalendarFilter::default()
            .and(CalendarRange::years(self.start_year, self.end_year)?)
            .and(CalendarRange::months(self.start_month, self.end_month)?))
    }

    fn validate(&self) -> Result<()> {
        self.calendar_filter()?;
        let baseline = self.baseline_year();
        if !self.years().contains(&baseline) {
            return Err(NdviError::configuration(format!(
                "baseline year {baseline} outside {}..={}",
                self.start_year, self.end_year
            )));
        }
        self.years().try_for_each(|year| self.time_start(year).map(|_| ()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    pub collection: String,
    pub qa_band: String,
    pub nir_band: String,
    pub red_band: String,
    pub cloud_bit: u8,
    pub cloud_shadow_bit: u8,
    /// Name of the derived band.
    pub index_band: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::of::<Landsat8>()
    }
}

impl SensorConfig {
    pub fn of<S: Sensor>() -> Self {
        Self {
            collection: S::COLLECTION.into(),
            qa_band: S::QA_BAND.into(),
            nir_band: S::NIR_BAND.into(),
            red_band: S::RED_BAND.into(),
            cloud_bit: S::CLOUD_BIT,
            cloud_shadow_bit: S::CLOUD_SHADOW_BIT,
            index_band: "NDVI".into(),
        }
    }

    /// Bands requested from the archive.
    pub fn bands(&self) -> Vec<String> {
        vec![
            self.qa_band.clone(),
            self.nir_band.clone(),
            self.red_band.clone(),
        ]
    }

    fn validate(&self) -> Result<()> {
        for bit in [self.cloud_bit, self.cloud_shadow_bit] {
            if bit >= 16 {
                return Err(NdviError::configuration(format!(
                    "qa bit {bit} does not fit a 16 bit quality band"
                )));
            }
        }
        if [&self.qa_band, &self.nir_band, &self.red_band, &self.index_band]
            .iter()
            .any(|name| name.is_empty())
        {
            return Err(NdviError::configuration("band names must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Nominal cell size in metres.
    pub scale: f64,
    pub crs: Crs,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scale: 500.,
            crs: Crs::wgs84(),
        }
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.) {
            return Err(NdviError::configuration(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        self.crs
            .ensure_supported()
            .map_err(|err| NdviError::configuration(err.to_string()))
    }
}

/// Stretch and colour ramp of a map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisParams {
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
}

impl VisParams {
    pub fn new(min: f64, max: f64, palette: &[&str]) -> Self {
        Self {
            min,
            max,
            palette: palette.iter().map(|color| color.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min <= self.max) {
            return Err(NdviError::configuration(format!(
                "invalid stretch {}..{}",
                self.min, self.max
            )));
        }
        if self.palette.is_empty() {
            return Err(NdviError::configuration("palette is empty"));
        }
        self.palette.iter().try_for_each(|color| parse_color(color).map(|_| ()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    pub difference: VisParams,
    pub background: VisParams,
    pub background_value: f64,
    pub background_countries: Vec<String>,
    /// Degrees added around the region bounding box.
    pub margin_degrees: f64,
    /// Degrees per map pixel.
    pub resolution: f64,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            difference: VisParams::new(-0.3, 0.3, &["yellow", "grey", "red"]),
            background: VisParams::new(0., 1., &["black"]),
            background_value: 0.3,
            background_countries: ["India", "Pakistan", "Nepal", "China"]
                .map(String::from)
                .to_vec(),
            margin_degrees: 1.,
            resolution: 0.01,
            zoom: 7,
        }
    }
}

impl MapConfig {
    fn validate(&self) -> Result<()> {
        self.difference.validate()?;
        self.background.validate()?;
        if !(self.margin_degrees.is_finite() && self.margin_degrees >= 0.) {
            return Err(NdviError::configuration("map.margin_degrees must not be negative"));
        }
        if !(self.resolution.is_finite() && self.resolution > 0.) {
            return Err(NdviError::configuration("map.resolution must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub line_width: f64,
    pub color: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "NDVI Time Series for Rice Crop (2018-2024) in Punjab and Haryana".into(),
            x_label: "Year".into(),
            y_label: "Mean NDVI".into(),
            line_width: 2.,
            color: "#1d6b99".into(),
            width: 800,
            height: 400,
        }
    }
}

impl ChartConfig {
    fn validate(&self) -> Result<()> {
        parse_color(&self.color)?;
        if self.width == 0 || self.height == 0 {
            return Err(NdviError::configuration("chart size must be positive"));
        }
        Ok(())
    }
}

/// Rows produced per year: one for the merged region or one per matched feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportGranularity {
    #[default]
    Merged,
    PerFeature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// File stem of the csv table.
    pub description: String,
    pub granularity: ExportGranularity,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            description: "Rice_NDVI_TimeSeries_2018_2024".into(),
            granularity: ExportGranularity::Merged,
        }
    }
}

impl ExportConfig {
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.description)
    }

    fn validate(&self) -> Result<()> {
        if self.description.is_empty()
            || self.description.contains(['/', '\\'])
            || self.description.starts_with('.')
        {
            return Err(NdviError::configuration(format!(
                "export description {:?} is not a valid file stem",
                self.description
            )));
        }
        Ok(())
    }
}
