use geo::{coord, CoordNum, Rect};

use crate::errors::{NdviError, Result};

pub trait Intersection {
    type Output;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output>;
}

/// Overlap of two axis aligned rectangles. Touching edges count as overlapping.
impl<T: CoordNum> Intersection for Rect<T> {
    type Output = Rect<T>;
    fn intersection(&self, rhs: &Self) -> Result<Rect<T>> {
        let larger = |a: T, b: T| if a > b { a } else { b };
        let smaller = |a: T, b: T| if a < b { a } else { b };
        let min = coord! {
            x: larger(self.min().x, rhs.min().x),
            y: larger(self.min().y, rhs.min().y),
        };
        let max = coord! {
            x: smaller(self.max().x, rhs.max().x),
            y: smaller(self.max().y, rhs.max().y),
        };
        if min.x > max.x || min.y > max.y {
            return Err(NdviError::NoIntersection);
        }
        Ok(Rect::new(min, max))
    }
}
