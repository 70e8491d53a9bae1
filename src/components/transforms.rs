use geo::{AffineTransform, Coord};
use shrinkwraprs::Shrinkwrap;

use crate::errors::{NdviError, Result};

/// Transform from pixel space `(col, row)` to geo space `(x, y)`.
#[derive(Shrinkwrap, Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(AffineTransform);

impl GeoTransform {
    pub fn new(a: f64, b: f64, xoff: f64, d: f64, e: f64, yoff: f64) -> Self {
        Self(AffineTransform::new(a, b, xoff, d, e, yoff))
    }

    /// From GDAL ordering `[xoff, a, b, yoff, d, e]`.
    pub fn from_gdal(gdal_transform: [f64; 6]) -> Self {
        Self::new(
            gdal_transform[1],
            gdal_transform[2],
            gdal_transform[0],
            gdal_transform[4],
            gdal_transform[5],
            gdal_transform[3],
        )
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.0.xoff(),
            self.0.a(),
            self.0.b(),
            self.0.yoff(),
            self.0.d(),
            self.0.e(),
        ]
    }

    /// North-up grid anchored at its top left corner.
    pub fn north_up(top_left: Coord, cell_width: f64, cell_height: f64) -> Self {
        Self::new(cell_width, 0., top_left.x, 0., -cell_height, top_left.y)
    }

    pub fn pixel_to_geo(&self, col: f64, row: f64) -> Coord {
        self.0.apply(Coord { x: col, y: row })
    }

    pub fn cell_center(&self, row: usize, col: usize) -> Coord {
        self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Size of a pixel along its columns and rows.
    pub fn cell_size(&self) -> (f64, f64) {
        (
            self.0.a().hypot(self.0.d()),
            self.0.b().hypot(self.0.e()),
        )
    }

    pub fn inverse(&self) -> Result<PixelTransform> {
        self.0
            .inverse()
            .map(PixelTransform)
            .ok_or(NdviError::NonInvertibleTransform)
    }
}

/// Transform from geo space `(x, y)` to pixel space `(col, row)`.
#[derive(Shrinkwrap, Debug, Clone, Copy, PartialEq)]
pub struct PixelTransform(AffineTransform);

impl PixelTransform {
    pub fn geo_to_pixel(&self, coord: Coord) -> Coord {
        self.0.apply(coord)
    }

    /// `(row, col)` of the pixel containing `coord`, if inside `shape` (rows, cols).
    pub fn index_of(&self, coord: Coord, shape: (usize, usize)) -> Option<(usize, usize)> {
        let pixel = self.geo_to_pixel(coord);
        let (col, row) = (pixel.x.floor(), pixel.y.floor());
        if !(col >= 0. && row >= 0.) {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < shape.0 && col < shape.1).then_some((row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use rstest::rstest;

    #[rstest]
    fn gdal_ordering_round_trips() {
        let gdal = [75., 0.01, 0., 31., 0., -0.01];
        assert_eq!(GeoTransform::from_gdal(gdal).to_gdal(), gdal);
    }

    #[rstest]
    #[case(coord! { x: 75.005, y: 30.995 }, Some((0, 0)))]
    #[case(coord! { x: 75.999, y: 30.001 }, Some((99, 99)))]
    #[case(coord! { x: 74.999, y: 30.5 }, None)]
    #[case(coord! { x: 75.5, y: 31.001 }, None)]
    #[case(coord! { x: 76.001, y: 30.5 }, None)]
    fn pixel_lookup(#[case] coord: Coord, #[case] expected: Option<(usize, usize)>) {
        let transform = GeoTransform::north_up(coord! { x: 75., y: 31. }, 0.01, 0.01);
        let inverse = transform.inverse().unwrap();
        assert_eq!(inverse.index_of(coord, (100, 100)), expected);
    }

    #[rstest]
    fn cell_centers_are_offset_by_half_a_pixel() {
        let transform = GeoTransform::north_up(coord! { x: 0., y: 10. }, 2., 1.);
        assert_eq!(transform.cell_center(0, 0), coord! { x: 1., y: 9.5 });
        assert_eq!(transform.cell_size(), (2., 1.));
    }

    #[rstest]
    fn singular_transform_has_no_inverse() {
        let transform = GeoTransform::new(0., 0., 0., 0., 0., 0.);
        assert!(matches!(
            transform.inverse(),
            Err(NdviError::NonInvertibleTransform)
        ));
    }
}
