use geo::{Contains, Coord, MultiPolygon, Point};
use log::debug;
use ndarray::{Array2, Zip};
use std::fmt::Debug;

use crate::{
    components::{
        bounds::{GeoBounds, GridSpec},
        transforms::{GeoTransform, PixelTransform},
        DataType,
    },
    crs_geo::Crs,
    errors::{NdviError, Result},
};

/// Single band grid of pixels, georeferenced by a [GeoTransform].
///
/// Float rasters mark no-data with `NaN`.
#[derive(Clone, PartialEq)]
pub struct Raster<T: DataType> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Crs,
}

impl<T: DataType> Debug for Raster<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("shape", &self.shape())
            .field("geo_bounds", &self.bounds().rect())
            .field("crs", &self.crs.as_str())
            .finish()
    }
}

impl<T: DataType> Raster<T> {
    pub fn new(data: Array2<T>, transform: GeoTransform, crs: Crs) -> Self {
        let raster = Self {
            data,
            transform,
            crs,
        };
        debug!("new {raster:?}");
        raster
    }

    pub fn filled(grid: &GridSpec, value: T) -> Self {
        Self::new(
            Array2::from_elem(grid.shape(), value),
            grid.transform(),
            grid.crs().clone(),
        )
    }

    pub fn on_grid(grid: &GridSpec, data: Array2<T>) -> Result<Self> {
        if data.dim() != grid.shape() {
            return Err(NdviError::Malformed {
                kind: "raster",
                reason: format!("data {:?} does not fit grid {:?}", data.dim(), grid.shape()),
            });
        }
        Ok(Self::new(data, grid.transform(), grid.crs().clone()))
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.data.get((row, col)).copied()
    }

    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::of_pixels(&self.transform, self.shape(), self.crs.clone())
    }

    /// Whether both rasters share shape, transform and crs.
    pub fn same_grid<U: DataType>(&self, other: &Raster<U>) -> bool {
        self.shape() == other.shape()
            && self.transform == other.transform
            && self.crs == other.crs
    }

    pub fn is_on(&self, grid: &GridSpec) -> bool {
        self.shape() == grid.shape() && self.transform == grid.transform() && &self.crs == grid.crs()
    }

    pub fn map<U: DataType>(&self, f: impl Fn(T) -> U + Sync + Send) -> Raster<U> {
        Raster {
            data: Zip::from(&self.data).par_map_collect(|value| f(*value)),
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    pub fn sampler(&self) -> Result<Sampler<'_, T>> {
        Ok(Sampler {
            raster: self,
            inverse: self.transform.inverse()?,
        })
    }
}

impl Raster<f64> {
    pub fn nodata(grid: &GridSpec) -> Self {
        Self::filled(grid, f64::NAN)
    }

    /// Nearest neighbour resampling onto `grid`. Cells outside the raster are no-data.
    pub fn resample(&self, grid: &GridSpec) -> Result<Raster<f64>> {
        if self.crs.ne(grid.crs()) {
            return Err(NdviError::UnsupportedCrs(format!(
                "{} (expected {})",
                self.crs,
                grid.crs()
            )));
        }
        let sampler = self.sampler()?;
        let transform = grid.transform();
        let mut data = Array2::from_elem(grid.shape(), f64::NAN);
        Zip::indexed(&mut data).par_for_each(|(row, col), value| {
            if let Some(sample) = sampler.sample(transform.cell_center(row, col)) {
                *value = sample;
            }
        });
        Raster::on_grid(grid, data)
    }

    /// No-data outside `geometry`, judged at cell centres.
    pub fn clip(&self, geometry: &MultiPolygon) -> Raster<f64> {
        let transform = self.transform;
        let mut data = self.data.clone();
        Zip::indexed(&mut data).par_for_each(|(row, col), value| {
            if !value.is_nan() && !geometry.contains(&Point::from(transform.cell_center(row, col)))
            {
                *value = f64::NAN;
            }
        });
        Raster {
            data,
            transform,
            crs: self.crs.clone(),
        }
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|value| !value.is_nan()).count()
    }

    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .data
            .iter()
            .filter(|value| !value.is_nan())
            .fold((0., 0usize), |(sum, count), value| (sum + value, count + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// Geo-space lookup into a [Raster].
#[derive(Debug, Clone, Copy)]
pub struct Sampler<'a, T: DataType> {
    raster: &'a Raster<T>,
    inverse: PixelTransform,
}

impl<T: DataType> Sampler<'_, T> {
    pub fn sample(&self, coord: Coord) -> Option<T> {
        self.inverse
            .index_of(coord, self.raster.shape())
            .and_then(|(row, col)| self.raster.get(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{square, wgs84_grid};
    use geo::{coord, Rect};
    use ndarray::array;
    use rstest::rstest;

    fn quadrants() -> Raster<f64> {
        Raster::new(
            array![[1., 2.], [3., f64::NAN]],
            GeoTransform::north_up(coord! { x: 0., y: 2. }, 1., 1.),
            Crs::wgs84(),
        )
    }

    #[rstest]
    fn bounds_cover_all_pixels() {
        assert_eq!(quadrants().bounds().rect(), Rect::new((0., 0.), (2., 2.)));
    }

    #[rstest]
    #[case(coord! { x: 0.5, y: 1.5 }, Some(1.))]
    #[case(coord! { x: 1.5, y: 1.5 }, Some(2.))]
    #[case(coord! { x: 0.5, y: 0.5 }, Some(3.))]
    #[case(coord! { x: 2.5, y: 0.5 }, None)]
    fn samples_nearest_pixel(#[case] at: Coord, #[case] expected: Option<f64>) {
        let raster = quadrants();
        assert_eq!(raster.sampler().unwrap().sample(at), expected);
    }

    #[rstest]
    fn resample_to_finer_grid_repeats_pixels() {
        let grid = wgs84_grid((0., 0.), (2., 2.), 0.5);
        let resampled = quadrants().resample(&grid).unwrap();
        assert_eq!(resampled.shape(), (4, 4));
        assert_eq!(resampled.get(0, 0), Some(1.));
        assert_eq!(resampled.get(1, 3), Some(2.));
        assert_eq!(resampled.get(3, 0), Some(3.));
        assert!(resampled.get(3, 3).unwrap().is_nan());
        assert_eq!(resampled.valid_count(), 12);
    }

    #[rstest]
    fn resample_outside_source_is_nodata() {
        let grid = wgs84_grid((10., 10.), (11., 11.), 0.5);
        assert_eq!(quadrants().resample(&grid).unwrap().valid_count(), 0);
    }

    #[rstest]
    fn resample_rejects_other_crs() {
        let grid = GridSpec::new(
            GeoBounds::new(Crs::from_epsg(32643), Rect::new((0., 0.), (2., 2.))),
            1.,
        )
        .unwrap();
        assert!(matches!(
            quadrants().resample(&grid),
            Err(NdviError::UnsupportedCrs(_))
        ));
    }

    #[rstest]
    fn clip_masks_cells_outside_geometry() {
        let clipped = quadrants().clip(&square((0., 1.), (1., 2.)));
        assert_eq!(clipped.get(0, 0), Some(1.));
        assert!(clipped.get(0, 1).unwrap().is_nan());
        assert!(clipped.get(1, 0).unwrap().is_nan());
        assert_eq!(clipped.valid_count(), 1);
    }

    #[rstest]
    fn mean_ignores_nodata() {
        assert_eq!(quadrants().mean(), Some(2.));
        let grid = wgs84_grid((0., 0.), (1., 1.), 0.5);
        assert_eq!(Raster::nodata(&grid).mean(), None);
    }
}
