use chrono::NaiveDate;
use geo::MultiPolygon;
use log::info;
use serde::Serialize;
use std::{fs, path::Path};

use crate::{
    config::ChartConfig,
    errors::{NdviError, Result},
    pipeline::{composite::AnnualComposite, reduce::RegionReducer},
};

pub const CHART_SVG: &str = "ndvi_timeseries.svg";
pub const CHART_JSON: &str = "ndvi_timeseries.json";

const MARGIN: f64 = 60.;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub time_start: NaiveDate,
    /// `None` for gap years.
    pub mean: Option<f64>,
}

/// Mean index over the region per year, ready to be charted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn new(
        composites: &[AnnualComposite],
        region: &MultiPolygon,
        reducer: &RegionReducer,
        chart: &ChartConfig,
    ) -> Result<Self> {
        let points = composites
            .iter()
            .map(|composite| {
                Ok(SeriesPoint {
                    year: composite.year,
                    time_start: composite.time_start,
                    mean: reducer.reduce(&composite.ndvi, region)?.mean,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            title: chart.title.clone(),
            x_label: chart.x_label.clone(),
            y_label: chart.y_label.clone(),
            points,
        })
    }

    /// Value range of the y axis, padded, `[-1, 1]` without values.
    fn y_range(&self) -> (f64, f64) {
        let values = self.points.iter().filter_map(|point| point.mean);
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        });
        if !min.is_finite() {
            return (-1., 1.);
        }
        let pad = ((max - min) * 0.1).max(0.05);
        (min - pad, max + pad)
    }

    /// Line chart with one vertex per year. Gap years break the line.
    pub fn to_svg(&self, chart: &ChartConfig) -> String {
        let (width, height) = (chart.width as f64, chart.height as f64);
        let (plot_w, plot_h) = (width - 2. * MARGIN, height - 2. * MARGIN);
        let years = self.points.len().max(1);
        let x = |index: usize| {
            if years == 1 {
                MARGIN + plot_w / 2.
            } else {
                MARGIN + plot_w * index as f64 / (years - 1) as f64
            }
        };
        let (y_min, y_max) = self.y_range();
        let y = |value: f64| MARGIN + plot_h * (1. - (value - y_min) / (y_max - y_min));

        let mut path = String::new();
        let mut pen_down = false;
        for (index, point) in self.points.iter().enumerate() {
            match point.mean {
                Some(mean) => {
                    let command = if pen_down { 'L' } else { 'M' };
                    path.push_str(&format!("{command}{:.2},{:.2} ", x(index), y(mean)));
                    pen_down = true;
                }
                None => pen_down = false,
            }
        }

        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
        );
        svg.push_str(&format!(
            "  <rect width=\"{width}\" height=\"{height}\" fill=\"white\"/>\n"
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"16\">{}</text>\n",
            width / 2.,
            MARGIN / 2.,
            escape(&self.title)
        ));
        svg.push_str(&format!(
            "  <line x1=\"{MARGIN}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"black\"/>\n",
            MARGIN + plot_h,
            MARGIN + plot_w,
            MARGIN + plot_h
        ));
        svg.push_str(&format!(
            "  <line x1=\"{MARGIN}\" y1=\"{MARGIN}\" x2=\"{MARGIN}\" y2=\"{:.2}\" stroke=\"black\"/>\n",
            MARGIN + plot_h
        ));
        for (index, point) in self.points.iter().enumerate() {
            svg.push_str(&format!(
                "  <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"12\">{}</text>\n",
                x(index),
                MARGIN + plot_h + 18.,
                point.year
            ));
        }
        for tick in 0..=4 {
            let value = y_min + (y_max - y_min) * tick as f64 / 4.;
            svg.push_str(&format!(
                "  <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"12\">{value:.2}</text>\n",
                MARGIN - 6.,
                y(value) + 4.
            ));
        }
        svg.push_str(&format!(
            "  <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"14\">{}</text>\n",
            width / 2.,
            height - 12.,
            escape(&self.x_label)
        ));
        svg.push_str(&format!(
            "  <text x=\"16\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"14\" transform=\"rotate(-90 16 {:.2})\">{}</text>\n",
            height / 2.,
            height / 2.,
            escape(&self.y_label)
        ));
        svg.push_str(&format!(
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
            path.trim_end(),
            escape(&chart.color),
            chart.line_width
        ));
        svg.push_str("</svg>\n");
        svg
    }

    /// Writes [CHART_SVG] and [CHART_JSON] into `dir`.
    pub fn write(&self, dir: &Path, chart: &ChartConfig) -> Result<()> {
        let svg_path = dir.join(CHART_SVG);
        fs::write(&svg_path, self.to_svg(chart)).map_err(|err| NdviError::export(&svg_path, err))?;
        let json_path = dir.join(CHART_JSON);
        let json =
            serde_json::to_string_pretty(self).map_err(|err| NdviError::export(&json_path, err))?;
        fs::write(&json_path, json).map_err(|err| NdviError::export(&json_path, err))?;
        info!("wrote chart of {} years to {}", self.points.len(), dir.display());
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::date;
    use rstest::{fixture, rstest};

    #[fixture]
    fn series() -> TimeSeries {
        let chart = ChartConfig::default();
        TimeSeries {
            title: chart.title,
            x_label: chart.x_label,
            y_label: chart.y_label,
            points: [(2018, Some(0.4)), (2019, Some(0.5)), (2020, None), (2021, Some(0.45))]
                .into_iter()
                .map(|(year, mean)| SeriesPoint {
                    year,
                    time_start: date(year, 6, 1),
                    mean,
                })
                .collect(),
        }
    }

    #[rstest]
    fn svg_carries_labels_and_style(series: TimeSeries) {
        let svg = series.to_svg(&ChartConfig::default());
        assert!(svg.contains("NDVI Time Series for Rice Crop (2018-2024) in Punjab and Haryana"));
        assert!(svg.contains(">Year</text>"));
        assert!(svg.contains(">Mean NDVI</text>"));
        assert!(svg.contains("stroke=\"#1d6b99\" stroke-width=\"2\""));
    }

    #[rstest]
    fn gap_years_break_the_line(series: TimeSeries) {
        let svg = series.to_svg(&ChartConfig::default());
        let path = svg
            .lines()
            .find(|line| line.contains("<path"))
            .unwrap();
        assert_eq!(path.matches('M').count(), 2);
        assert_eq!(path.matches('L').count(), 1);
    }

    #[rstest]
    fn all_gaps_draw_no_line(mut series: TimeSeries) {
        series.points.iter_mut().for_each(|point| point.mean = None);
        assert_eq!(series.y_range(), (-1., 1.));
        let svg = series.to_svg(&ChartConfig::default());
        assert!(svg.contains("<path d=\"\""));
    }

    #[rstest]
    fn writes_svg_and_json(series: TimeSeries) {
        let dir = tempfile::tempdir().unwrap();
        series.write(dir.path(), &ChartConfig::default()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(CHART_JSON)).unwrap())
                .unwrap();
        assert_eq!(json["points"][0]["time_start"], "2018-06-01");
        assert!(json["points"][2]["mean"].is_null());
        assert!(dir.path().join(CHART_SVG).exists());
    }
}
