//! Map rendering: colour ramps and layer images.

mod layers;
pub use layers::{render, viewport, ManifestLayer, MapLayer, MapManifest, MAP_MANIFEST};

use image::Rgba;

use crate::{
    config::VisParams,
    errors::{NdviError, Result},
};

/// Basic CSS colour keywords.
const NAMED_COLORS: [(&str, [u8; 3]); 18] = [
    ("black", [0, 0, 0]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("white", [255, 255, 255]),
    ("maroon", [128, 0, 0]),
    ("red", [255, 0, 0]),
    ("purple", [128, 0, 128]),
    ("fuchsia", [255, 0, 255]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("olive", [128, 128, 0]),
    ("yellow", [255, 255, 0]),
    ("navy", [0, 0, 128]),
    ("blue", [0, 0, 255]),
    ("teal", [0, 128, 128]),
    ("aqua", [0, 255, 255]),
    ("orange", [255, 165, 0]),
];

/// Parses a colour keyword or a `#rrggbb` / `rrggbb` hex triplet.
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let value = value.trim();
    if let Some((_, [r, g, b])) = NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
    {
        return Ok(Rgba([*r, *g, *b, 255]));
    }
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16);
        if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
            return Ok(Rgba([r, g, b, 255]));
        }
    }
    Err(NdviError::configuration(format!("unknown colour {value:?}")))
}

/// Linear stretch of `[min, max]` over evenly spaced palette stops.
///
/// Values outside the stretch clamp to the end colours and `NaN` maps to nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    min: f64,
    max: f64,
    stops: Vec<Rgba<u8>>,
}

impl ColorRamp {
    pub fn new(min: f64, max: f64, stops: Vec<Rgba<u8>>) -> Result<Self> {
        if stops.is_empty() {
            return Err(NdviError::configuration("color ramp needs at least one colour"));
        }
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(NdviError::configuration(format!(
                "invalid stretch {min}..{max}"
            )));
        }
        Ok(Self { min, max, stops })
    }

    pub fn from_vis(vis: &VisParams) -> Result<Self> {
        let stops = vis
            .palette
            .iter()
            .map(|color| parse_color(color))
            .collect::<Result<Vec<_>>>()?;
        Self::new(vis.min, vis.max, stops)
    }

    pub fn color(&self, value: f64) -> Option<Rgba<u8>> {
        if value.is_nan() {
            return None;
        }
        let range = self.max - self.min;
        let t = if range > 0. {
            ((value - self.min) / range).clamp(0., 1.)
        } else {
            0.
        };
        let position = t * (self.stops.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(self.stops.len() - 1);
        let frac = position - lower as f64;
        let (from, to) = (self.stops[lower], self.stops[upper]);
        let mut channels = [0u8; 4];
        for (channel, (a, b)) in channels.iter_mut().zip(from.0.iter().zip(to.0.iter())) {
            *channel = (*a as f64 + (*b as f64 - *a as f64) * frac).round() as u8;
        }
        Some(Rgba(channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn difference_ramp() -> ColorRamp {
        ColorRamp::from_vis(&VisParams::new(-0.3, 0.3, &["yellow", "grey", "red"])).unwrap()
    }

    #[rstest]
    #[case("yellow", [255, 255, 0, 255])]
    #[case("Grey", [128, 128, 128, 255])]
    #[case("#1d6b99", [29, 107, 153, 255])]
    #[case("1D6B99", [29, 107, 153, 255])]
    fn parses_names_and_hex(#[case] value: &str, #[case] expected: [u8; 4]) {
        assert_eq!(parse_color(value).unwrap(), Rgba(expected));
    }

    #[rstest]
    #[case("")]
    #[case("#12345")]
    #[case("#gggggg")]
    #[case("chartreuse-ish")]
    fn rejects_unknown_colours(#[case] value: &str) {
        assert!(matches!(parse_color(value), Err(NdviError::Configuration(_))));
    }

    #[rstest]
    #[case(-0.3, [255, 255, 0, 255])]
    #[case(0., [128, 128, 128, 255])]
    #[case(0.3, [255, 0, 0, 255])]
    #[case(-1., [255, 255, 0, 255])]
    #[case(0.9, [255, 0, 0, 255])]
    fn ramp_stops_and_clamping(
        difference_ramp: ColorRamp,
        #[case] value: f64,
        #[case] expected: [u8; 4],
    ) {
        assert_eq!(difference_ramp.color(value), Some(Rgba(expected)));
    }

    #[rstest]
    fn ramp_interpolates_between_stops() {
        let ramp = ColorRamp::from_vis(&VisParams::new(0., 2., &["black", "white"])).unwrap();
        assert_eq!(ramp.color(0.5), Some(Rgba([64, 64, 64, 255])));
    }

    #[rstest]
    fn nan_is_transparent(difference_ramp: ColorRamp) {
        assert_eq!(difference_ramp.color(f64::NAN), None);
    }

    #[rstest]
    fn single_colour_palette_paints_everything() {
        let ramp = ColorRamp::from_vis(&VisParams::new(0., 1., &["black"])).unwrap();
        assert_eq!(ramp.color(0.3), Some(Rgba([0, 0, 0, 255])));
    }
}
