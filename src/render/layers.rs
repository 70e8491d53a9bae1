use geo::{Coord, MultiPolygon};
use image::RgbaImage;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::{fs, path::Path};

use super::ColorRamp;
use crate::{
    components::{
        bounds::{GeoBounds, GridSpec},
        raster::Raster,
    },
    config::{MapConfig, VisParams},
    errors::{NdviError, Result},
};

pub const MAP_MANIFEST: &str = "layers.json";

/// Named raster with its visualization parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    pub name: String,
    pub raster: Raster<f64>,
    pub vis: VisParams,
}

impl MapLayer {
    pub fn new(name: impl Into<String>, raster: Raster<f64>, vis: VisParams) -> Self {
        Self {
            name: name.into(),
            raster,
            vis,
        }
    }

    /// Constant layer over `countries`, drawn under the data layers.
    pub fn background(countries: &MultiPolygon, viewport: &GridSpec, map: &MapConfig) -> Self {
        Self::new(
            "Background",
            Raster::filled(viewport, map.background_value).clip(countries),
            map.background.clone(),
        )
    }

    pub fn file_name(&self) -> String {
        let slug = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect::<String>();
        format!("{slug}.png")
    }

    /// Paints the layer onto `image`, a rendering of `viewport`. No-data stays untouched.
    pub fn paint(&self, image: &mut RgbaImage, viewport: &GridSpec) -> Result<()> {
        let (rows, cols) = viewport.shape();
        if (image.height() as usize, image.width() as usize) != (rows, cols) {
            return Err(NdviError::Malformed {
                kind: "map image",
                reason: format!("image does not match viewport {rows}x{cols}"),
            });
        }
        if cols == 0 {
            return Ok(());
        }
        let ramp = ColorRamp::from_vis(&self.vis)?;
        let sampler = self.raster.sampler()?;
        let transform = viewport.transform();
        image
            .par_chunks_mut(cols * 4)
            .enumerate()
            .for_each(|(row, pixels)| {
                for (col, pixel) in pixels.chunks_exact_mut(4).enumerate() {
                    let color = sampler
                        .sample(transform.cell_center(row, col))
                        .and_then(|value| ramp.color(value));
                    if let Some(color) = color {
                        pixel.copy_from_slice(&color.0);
                    }
                }
            });
        Ok(())
    }
}

/// Layers stacked in order over a transparent canvas.
pub fn render(layers: &[&MapLayer], viewport: &GridSpec) -> Result<RgbaImage> {
    let (rows, cols) = viewport.shape();
    let mut image = RgbaImage::new(cols as u32, rows as u32);
    for layer in layers {
        layer.paint(&mut image, viewport)?;
    }
    Ok(image)
}

/// Viewport over `bounds` grown by the configured margin.
pub fn viewport(bounds: &GeoBounds, map: &MapConfig) -> Result<GridSpec> {
    GridSpec::new(bounds.buffered(map.margin_degrees), map.resolution)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestLayer {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
    pub file: String,
}

/// Description of the written map: where to centre it and which images to overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapManifest {
    /// (lon, lat)
    pub center: [f64; 2],
    pub zoom: u8,
    /// [min lon, min lat, max lon, max lat]
    pub bounds: [f64; 4],
    pub layers: Vec<ManifestLayer>,
}

impl MapManifest {
    /// Writes one image per data layer, each over the background, then [MAP_MANIFEST].
    pub fn write(
        dir: &Path,
        background: Option<&MapLayer>,
        layers: &[MapLayer],
        viewport: &GridSpec,
        center: Coord,
        map: &MapConfig,
    ) -> Result<Self> {
        let rect = viewport.bounds().rect();
        let mut manifest = Self {
            center: [center.x, center.y],
            zoom: map.zoom,
            bounds: [rect.min().x, rect.min().y, rect.max().x, rect.max().y],
            layers: Vec::with_capacity(layers.len() + 1),
        };
        let mut entries = background
            .into_iter()
            .map(|layer| (layer, vec![layer]))
            .collect::<Vec<_>>();
        entries.extend(layers.iter().map(|layer| {
            let stack = background.into_iter().chain([layer]).collect::<Vec<_>>();
            (layer, stack)
        }));
        for (layer, stack) in entries {
            let file = layer.file_name();
            let path = dir.join(&file);
            render(&stack, viewport)?
                .save(&path)
                .map_err(|err| NdviError::export(&path, err))?;
            debug!("rendered {} to {}", layer.name, path.display());
            manifest.layers.push(ManifestLayer {
                name: layer.name.clone(),
                min: layer.vis.min,
                max: layer.vis.max,
                palette: layer.vis.palette.clone(),
                file,
            });
        }
        let path = dir.join(MAP_MANIFEST);
        let json =
            serde_json::to_string_pretty(&manifest).map_err(|err| NdviError::export(&path, err))?;
        fs::write(&path, json).map_err(|err| NdviError::export(&path, err))?;
        info!(
            "wrote {} map layers to {}",
            manifest.layers.len(),
            dir.display()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{square, wgs84_grid};
    use image::Rgba;
    use rstest::{fixture, rstest};

    #[fixture]
    fn canvas() -> GridSpec {
        wgs84_grid((0., 0.), (4., 4.), 1.)
    }

    fn difference_layer() -> MapLayer {
        let grid = wgs84_grid((1., 1.), (3., 3.), 1.);
        let raster =
            Raster::on_grid(&grid, ndarray::array![[-0.3, 0.], [0.3, f64::NAN]]).unwrap();
        MapLayer::new(
            "NDVI Difference 2018 to 2019",
            raster,
            MapConfig::default().difference,
        )
    }

    #[rstest]
    fn layers_stack_over_background(canvas: GridSpec) {
        let map = MapConfig::default();
        let background = MapLayer::background(&square((0., 0.), (4., 2.)), &canvas, &map);
        let layer = difference_layer();
        let image = render(&[&background, &layer], &canvas).unwrap();

        assert_eq!(image.dimensions(), (4, 4));
        // north west corner: nothing
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        // data layer on top
        assert_eq!(image.get_pixel(1, 1), &Rgba([255, 255, 0, 255]));
        assert_eq!(image.get_pixel(2, 1), &Rgba([128, 128, 128, 255]));
        assert_eq!(image.get_pixel(1, 2), &Rgba([255, 0, 0, 255]));
        // no-data lets the background through
        assert_eq!(image.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(3, 3), &Rgba([0, 0, 0, 255]));
    }

    #[rstest]
    fn file_names_are_slugs() {
        assert_eq!(
            difference_layer().file_name(),
            "ndvi_difference_2018_to_2019.png"
        );
    }

    #[rstest]
    fn viewport_adds_margin() {
        let bounds = GeoBounds::new(crate::Crs::wgs84(), geo::Rect::new((75., 30.), (76., 31.)));
        let grid = viewport(&bounds, &MapConfig::default()).unwrap();
        assert_eq!(grid.bounds().rect(), geo::Rect::new((74., 29.), (77., 32.)));
    }

    #[rstest]
    fn writes_images_and_manifest(canvas: GridSpec) {
        let dir = tempfile::tempdir().unwrap();
        let map = MapConfig::default();
        let background = MapLayer::background(&square((0., 0.), (4., 4.)), &canvas, &map);
        let manifest = MapManifest::write(
            dir.path(),
            Some(&background),
            &[difference_layer()],
            &canvas,
            Coord { x: 2., y: 2. },
            &map,
        )
        .unwrap();

        assert_eq!(manifest.zoom, 7);
        assert_eq!(manifest.layers.len(), 2);
        assert_eq!(manifest.layers[0].file, "background.png");
        assert_eq!(manifest.layers[1].palette, ["yellow", "grey", "red"]);
        let image = image::open(dir.path().join(&manifest.layers[1].file))
            .unwrap()
            .to_rgba8();
        assert_eq!(image.get_pixel(3, 3), &Rgba([0, 0, 0, 255]));
        assert!(dir.path().join(MAP_MANIFEST).exists());
    }
}
