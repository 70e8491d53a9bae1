use chrono::NaiveDate;
use geo::{coord, MultiPolygon, Rect};
use ndarray::Array2;
use std::{fs, io::BufWriter, path::Path};
use tiff::{
    encoder::{colortype::Gray16, TiffEncoder},
    tags::Tag,
};

use crate::{
    components::{bounds::GeoBounds, bounds::GridSpec, raster::Raster, transforms::GeoTransform},
    crs_geo::Crs,
    scene::Scene,
    source::AdminFeature,
};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn square(min: (f64, f64), max: (f64, f64)) -> MultiPolygon {
    MultiPolygon::new(vec![Rect::new(min, max).to_polygon()])
}

pub fn wgs84_grid(min: (f64, f64), max: (f64, f64), cell: f64) -> GridSpec {
    GridSpec::new(GeoBounds::new(Crs::wgs84(), Rect::new(min, max)), cell).unwrap()
}

pub fn admin_feature(country: &str, region: &str, geometry: MultiPolygon) -> AdminFeature {
    AdminFeature::new([("ADM0_NAME", country), ("ADM1_NAME", region)], geometry)
}

/// Scene covering lon 75..76, lat 30..31 with 0.1 degree pixels and constant bands.
pub fn landsat_scene(id: &str, acquired: NaiveDate, nir: u16, red: u16, qa: u16) -> Scene {
    let transform = GeoTransform::north_up(coord! { x: 75., y: 31. }, 0.1, 0.1);
    let band = |value: u16| Raster::new(Array2::from_elem((10, 10), value), transform, Crs::wgs84());
    Scene::new(
        id,
        acquired,
        [
            ("QA_PIXEL".to_string(), band(qa)),
            ("SR_B5".to_string(), band(nir)),
            ("SR_B4".to_string(), band(red)),
        ],
    )
    .unwrap()
}

/// Single band 16 bit GeoTIFF with square `cell` pixels, geographic when `epsg` is 4326 and
/// projected otherwise.
pub fn write_geotiff(
    path: &Path,
    data: &Array2<u16>,
    top_left: (f64, f64),
    cell: f64,
    epsg: u16,
) {
    let (rows, cols) = data.dim();
    let (model_type, crs_key) = if epsg == 4326 { (2, 2048) } else { (1, 3072) };
    let mut encoder = TiffEncoder::new(BufWriter::new(fs::File::create(path).unwrap())).unwrap();
    let mut image = encoder.new_image::<Gray16>(cols as u32, rows as u32).unwrap();
    image
        .encoder()
        .write_tag(Tag::Unknown(33550), &[cell, cell, 0.][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::Unknown(33922), &[0., 0., 0., top_left.0, top_left.1, 0.][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::Unknown(34735),
            &[1u16, 1, 0, 2, 1024, 0, 1, model_type, crs_key, 0, 1, epsg][..],
        )
        .unwrap();
    let samples: Vec<u16> = data.iter().copied().collect();
    image.write_data(&samples).unwrap();
}
