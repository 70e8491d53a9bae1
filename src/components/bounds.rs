use geo::{coord, Coord, Rect};
use shrinkwraprs::Shrinkwrap;

use crate::{
    components::transforms::GeoTransform,
    crs_geo::{Crs, CrsGeometry},
    errors::{NdviError, Result},
    intersection::Intersection,
};

/// Metres per degree of longitude at the equator, used to turn a nominal scale into degrees.
pub const METERS_PER_DEGREE: f64 = 111_319.490_793;

#[derive(Shrinkwrap, Clone, Debug, PartialEq)]
pub struct GeoBounds(CrsGeometry<Rect>);

impl GeoBounds {
    pub fn new(crs: Crs, rect: Rect) -> Self {
        Self(CrsGeometry::new(crs, rect))
    }

    pub fn rect(&self) -> Rect {
        *self.0.geometry()
    }

    /// Bounding box of the corners of a `shape` (rows, cols) pixel grid.
    pub fn of_pixels(transform: &GeoTransform, shape: (usize, usize), crs: Crs) -> Self {
        let (rows, cols) = (shape.0 as f64, shape.1 as f64);
        let corners = [(0., 0.), (cols, 0.), (0., rows), (cols, rows)]
            .map(|(col, row)| transform.pixel_to_geo(col, row));
        let (min, max) = corners.iter().skip(1).fold(
            (corners[0], corners[0]),
            |(min, max), corner| {
                (
                    coord! { x: min.x.min(corner.x), y: min.y.min(corner.y) },
                    coord! { x: max.x.max(corner.x), y: max.y.max(corner.y) },
                )
            },
        );
        Self::new(crs, Rect::new(min, max))
    }

    /// (width, height)
    pub fn shape(&self) -> Coord {
        self.rect().max() - self.rect().min()
    }

    pub fn buffered(&self, margin: f64) -> Self {
        let rect = self.rect();
        let margin = coord! { x: margin, y: margin };
        Self::new(
            self.crs().clone(),
            Rect::new(rect.min() - margin, rect.max() + margin),
        )
    }
}

impl Intersection for GeoBounds {
    type Output = GeoBounds;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output> {
        Ok(GeoBounds(self.0.intersection(&rhs.0)?))
    }
}

impl From<CrsGeometry<Rect>> for GeoBounds {
    fn from(value: CrsGeometry<Rect>) -> Self {
        Self(value)
    }
}

/// Regular north-up grid of square cells covering `bounds`, anchored at its top left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSpec {
    bounds: GeoBounds,
    cell_size: f64,
    /// (rows, cols)
    shape: (usize, usize),
}

impl GridSpec {
    pub fn new(bounds: GeoBounds, cell_size: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.) {
            return Err(NdviError::configuration(format!(
                "grid cell size must be positive, got {cell_size}"
            )));
        }
        let extent = bounds.shape();
        // rounding noise must not add a row or column
        let cells = |length: f64| (length / cell_size - 1e-9).ceil().max(0.) as usize;
        let shape = (cells(extent.y), cells(extent.x));
        Ok(Self {
            bounds,
            cell_size,
            shape,
        })
    }

    /// Grid whose cells measure `scale` metres at the equator.
    pub fn for_scale(bounds: GeoBounds, scale: f64) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.) {
            return Err(NdviError::configuration(format!(
                "scale must be positive, got {scale}"
            )));
        }
        Self::new(bounds, scale / METERS_PER_DEGREE)
    }

    pub fn empty(crs: Crs) -> Self {
        let origin = coord! { x: 0., y: 0. };
        Self {
            bounds: GeoBounds::new(crs, Rect::new(origin, origin)),
            cell_size: 1.,
            shape: (0, 0),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0 == 0 || self.shape.1 == 0
    }

    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    pub fn crs(&self) -> &Crs {
        self.bounds.crs()
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn transform(&self) -> GeoTransform {
        let rect = self.bounds.rect();
        GeoTransform::north_up(
            coord! { x: rect.min().x, y: rect.max().y },
            self.cell_size,
            self.cell_size,
        )
    }

    pub fn cell_center(&self, row: usize, col: usize) -> Coord {
        self.transform().cell_center(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bounds(min: (f64, f64), max: (f64, f64)) -> GeoBounds {
        GeoBounds::new(Crs::wgs84(), Rect::new(min, max))
    }

    #[rstest]
    fn grid_covers_bounds_with_whole_cells() {
        let grid = GridSpec::new(bounds((75., 30.), (76., 30.55)), 0.1).unwrap();
        assert_eq!(grid.shape(), (6, 10));
        let center = grid.cell_center(0, 0);
        assert!((center.x - 75.05).abs() < 1e-9);
        assert!((center.y - 30.5).abs() < 1e-9);
    }

    #[rstest]
    fn nominal_scale_is_converted_to_degrees() {
        let grid = GridSpec::for_scale(bounds((0., 0.), (1., 1.)), 500.).unwrap();
        assert!((grid.cell_size() - 500. / METERS_PER_DEGREE).abs() < 1e-12);
        assert_eq!(grid.shape(), (223, 223));
    }

    #[rstest]
    #[case(0.)]
    #[case(-500.)]
    #[case(f64::NAN)]
    fn rejects_non_positive_scale(#[case] scale: f64) {
        assert!(matches!(
            GridSpec::for_scale(bounds((0., 0.), (1., 1.)), scale),
            Err(NdviError::Configuration(_))
        ));
    }

    #[rstest]
    fn buffered_bounds_grow_on_every_side() {
        let buffered = bounds((75., 30.), (76., 31.)).buffered(1.);
        assert_eq!(buffered.rect(), Rect::new((74., 29.), (77., 32.)));
    }

    #[rstest]
    fn empty_grid_has_no_cells() {
        assert!(GridSpec::empty(Crs::wgs84()).is_empty());
    }
}
