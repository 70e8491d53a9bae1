pub mod band;
pub mod bounds;
pub mod file;
pub mod files;
pub mod raster;
pub mod transforms;

use num_traits::NumCast;
use std::fmt::Debug;

/// Pixel type of a [raster::Raster].
pub trait DataType: Copy + Send + Sync + Debug + PartialEq + NumCast + 'static {}

impl<T> DataType for T where T: Copy + Send + Sync + Debug + PartialEq + NumCast + 'static {}
