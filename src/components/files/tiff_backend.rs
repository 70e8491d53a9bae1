//! Pure Rust GeoTIFF reader for single band files.

use log::warn;
use ndarray::Array2;
use num_traits::NumCast;
use std::{fs, io::BufReader, path::Path, sync::Arc};
use tiff::{
    decoder::{Decoder, DecodingResult},
    tags::Tag,
    ColorType,
};

use crate::{
    components::{file::File, transforms::GeoTransform},
    crs_geo::Crs,
    errors::{NdviError, Result},
};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;

const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

#[derive(Debug, Clone)]
pub struct TiffFile {
    path: Arc<Path>,
    shape: (usize, usize),
    transform: GeoTransform,
    crs: Crs,
}

impl File for TiffFile {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut decoder = decoder(path.as_ref())?;
        let (width, height) = decoder.dimensions()?;
        if !matches!(decoder.colortype()?, ColorType::Gray(_)) {
            return Err(malformed(path.as_ref(), "only single band files are supported"));
        }
        let geo_keys = GeoKeys::read(&mut decoder)?;
        let transform = read_transform(&mut decoder, geo_keys.pixel_is_point)
            .ok_or_else(|| malformed(path.as_ref(), "no georeferencing tags"))??;
        let crs = match geo_keys.crs {
            Some(crs) => crs,
            None => {
                warn!(
                    "{} carries no crs geo key, assuming {}",
                    path.as_ref().display(),
                    Crs::WGS84
                );
                Crs::wgs84()
            }
        };
        Ok(Self {
            path: Arc::from(path.as_ref()),
            shape: (height as usize, width as usize),
            transform,
            crs,
        })
    }

    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn shape(&self) -> (usize, usize) {
        self.shape
    }

    fn crs(&self) -> Crs {
        self.crs.clone()
    }

    fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn num_bands(&self) -> usize {
        1
    }

    fn read_band(&self, index: usize) -> Result<Array2<u16>> {
        if index != 0 {
            return Err(malformed(&self.path, &format!("band {index} out of range")));
        }
        let samples = match decoder(&self.path)?.read_image()? {
            DecodingResult::U8(buf) => cast_samples(buf),
            DecodingResult::U16(buf) => Some(buf),
            DecodingResult::U32(buf) => cast_samples(buf),
            DecodingResult::U64(buf) => cast_samples(buf),
            DecodingResult::I8(buf) => cast_samples(buf),
            DecodingResult::I16(buf) => cast_samples(buf),
            DecodingResult::I32(buf) => cast_samples(buf),
            DecodingResult::I64(buf) => cast_samples(buf),
            DecodingResult::F32(buf) => cast_samples(buf),
            DecodingResult::F64(buf) => cast_samples(buf),
        }
        .ok_or_else(|| malformed(&self.path, "samples do not fit in 16 bit unsigned integers"))?;
        Ok(Array2::from_shape_vec(self.shape, samples)?)
    }
}

fn decoder(path: &Path) -> Result<Decoder<BufReader<fs::File>>> {
    Ok(Decoder::new(BufReader::new(fs::File::open(path)?))?)
}

fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn malformed(path: &Path, reason: &str) -> NdviError {
    NdviError::Malformed {
        kind: "geotiff",
        reason: format!("{}: {reason}", path.display()),
    }
}

fn cast_samples<S: NumCast + Copy>(buf: Vec<S>) -> Option<Vec<u16>> {
    buf.into_iter().map(<u16 as NumCast>::from).collect()
}

#[derive(Debug, Default)]
struct GeoKeys {
    crs: Option<Crs>,
    pixel_is_point: bool,
}

impl GeoKeys {
    /// Header `[version, revision, minor, count]` followed by `count` entries of
    /// `[key, location, count, value]`.
    fn read<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Self> {
        let directory = decoder.find_tag_unsigned_vec::<u16>(geo_tag(GEO_KEY_DIRECTORY_TAG))?;
        let Some(directory) = directory else {
            return Ok(Self::default());
        };
        let mut keys = Self::default();
        let mut geographic = None;
        for entry in directory.chunks_exact(4).skip(1) {
            let (key, location, value) = (entry[0], entry[1], entry[3]);
            if location != 0 {
                continue;
            }
            match key {
                GT_RASTER_TYPE_KEY => keys.pixel_is_point = value == RASTER_PIXEL_IS_POINT,
                PROJECTED_CS_TYPE_KEY if value != USER_DEFINED => {
                    keys.crs = Some(Crs::from_epsg(value.into()))
                }
                GEOGRAPHIC_TYPE_KEY if value != USER_DEFINED => {
                    geographic = Some(Crs::from_epsg(value.into()))
                }
                _ => (),
            }
        }
        keys.crs = keys.crs.or(geographic);
        Ok(keys)
    }
}

fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    pixel_is_point: bool,
) -> Option<Result<GeoTransform>> {
    let half = if pixel_is_point { 0.5 } else { 0. };
    match decoder.find_tag(geo_tag(MODEL_TRANSFORMATION_TAG)) {
        Err(err) => return Some(Err(err.into())),
        Ok(Some(value)) => {
            return Some(value.into_f64_vec().map_err(NdviError::from).and_then(
                |matrix| match matrix.as_slice() {
                    [a, b, _, xoff, d, e, _, yoff, ..] => {
                        let transform = GeoTransform::new(*a, *b, *xoff, *d, *e, *yoff);
                        let origin = transform.pixel_to_geo(-half, -half);
                        Ok(GeoTransform::new(*a, *b, origin.x, *d, *e, origin.y))
                    }
                    _ => Err(NdviError::Malformed {
                        kind: "geotiff",
                        reason: "ModelTransformation needs 16 values".into(),
                    }),
                },
            ));
        }
        Ok(None) => (),
    }
    let scale = decoder.find_tag(geo_tag(MODEL_PIXEL_SCALE_TAG));
    let tiepoint = decoder.find_tag(geo_tag(MODEL_TIEPOINT_TAG));
    match (scale, tiepoint) {
        (Ok(Some(scale)), Ok(Some(tiepoint))) => Some(
            scale
                .into_f64_vec()
                .and_then(|scale| Ok((scale, tiepoint.into_f64_vec()?)))
                .map_err(NdviError::from)
                .and_then(|(scale, tiepoint)| match (scale.as_slice(), tiepoint.as_slice()) {
                    ([sx, sy, ..], [i, j, _, x, y, ..]) => Ok(GeoTransform::new(
                        *sx,
                        0.,
                        x - (i + half) * sx,
                        0.,
                        -sy,
                        y + (j + half) * sy,
                    )),
                    _ => Err(NdviError::Malformed {
                        kind: "geotiff",
                        reason: "ModelPixelScale needs 3 values and ModelTiepoint 6".into(),
                    }),
                }),
        ),
        (Err(err), _) | (_, Err(err)) => Some(Err(err.into())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_geotiff;
    use geo::Rect;
    use rstest::rstest;

    #[rstest]
    fn reads_georeferenced_band() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.tif");
        let data = Array2::from_shape_fn((20, 30), |(row, col)| (row * 100 + col) as u16);
        write_geotiff(&path, &data, (75., 31.), 0.01, 4326);

        let file = TiffFile::open(&path).unwrap();
        assert_eq!(file.shape(), (20, 30));
        assert_eq!(file.crs(), Crs::wgs84());
        assert_eq!(file.num_bands(), 1);
        let footprint = file.footprint().rect();
        let expected = Rect::new((75., 30.8), (75.3, 31.));
        assert!((footprint.min().x - expected.min().x).abs() < 1e-9);
        assert!((footprint.min().y - expected.min().y).abs() < 1e-9);
        assert!((footprint.max().x - expected.max().x).abs() < 1e-9);
        assert!((footprint.max().y - expected.max().y).abs() < 1e-9);

        let raster = file.read_raster(0).unwrap();
        assert_eq!(raster.data(), &data);
        assert!(file.read_band(1).is_err());
    }

    #[rstest]
    fn projected_crs_key_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("utm.tif");
        write_geotiff(&path, &Array2::zeros((4, 4)), (300_000., 3_400_000.), 30., 32643);

        let file = TiffFile::open(&path).unwrap();
        assert_eq!(file.crs(), Crs::from_epsg(32643));
        let footprint = file.footprint().rect();
        assert!((footprint.min().x - 300_000.).abs() < 1e-6);
        assert!((footprint.min().y - 3_399_880.).abs() < 1e-6);
    }

    #[rstest]
    fn missing_file_is_io_error() {
        assert!(matches!(
            TiffFile::open("does/not/exist.tif"),
            Err(NdviError::Io(_))
        ));
    }

    #[rstest]
    #[case(vec![1u32, 65535], Some(vec![1u16, 65535]))]
    #[case(vec![1u32, 65536], None)]
    fn samples_must_fit_u16(#[case] input: Vec<u32>, #[case] expected: Option<Vec<u16>>) {
        assert_eq!(cast_samples(input), expected);
    }
}
