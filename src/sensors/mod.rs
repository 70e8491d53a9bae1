use std::fmt::Debug;

mod landsat8;
pub use landsat8::{Landsat8, QaBit};

/// Band layout of a surface reflectance product.
pub trait Sensor: Debug {
    const COLLECTION: &'static str;
    const QA_BAND: &'static str;
    const NIR_BAND: &'static str;
    const RED_BAND: &'static str;
    const CLOUD_BIT: u8;
    const CLOUD_SHADOW_BIT: u8;
}
