use std::{fmt, sync::Arc};

use geo::{BoundingRect, Rect};
use shrinkwraprs::Shrinkwrap;

use crate::{
    errors::{NdviError, Result},
    intersection::Intersection,
};

/// Authority code of a coordinate reference system, normalized to `AUTH:CODE`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(Arc<str>);

impl Crs {
    pub const WGS84: &'static str = "EPSG:4326";

    pub fn wgs84() -> Self {
        Crs(Arc::from(Self::WGS84))
    }

    pub fn from_epsg(code: u32) -> Self {
        Crs(Arc::from(format!("EPSG:{code}")))
    }

    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.split_once(':') {
            Some((authority, code))
                if !authority.is_empty()
                    && !code.is_empty()
                    && code.chars().all(|c| c.is_ascii_digit()) =>
            {
                Ok(Crs(Arc::from(normalized)))
            }
            _ => Err(NdviError::configuration(format!(
                "crs {value:?} is not of the form AUTHORITY:CODE"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    pub fn is_wgs84(&self) -> bool {
        self.as_str() == Self::WGS84
    }

    /// Only geographic WGS84 coordinates are handled, no reprojection is done.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.is_wgs84() {
            Ok(())
        } else {
            Err(NdviError::UnsupportedCrs(self.to_string()))
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Crs {
    type Error = NdviError;
    fn try_from(value: String) -> Result<Self> {
        Crs::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.as_str().to_string()
    }
}

/// Geometry tagged with the crs its coordinates are expressed in.
#[derive(Shrinkwrap, Debug, Clone, PartialEq)]
pub struct CrsGeometry<G> {
    crs: Crs,
    #[shrinkwrap(main_field)]
    geometry: G,
}

impl<G> CrsGeometry<G> {
    pub fn new(crs: Crs, geometry: G) -> Self {
        Self { crs, geometry }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    fn geometry_in(&self, crs: &Crs) -> Result<&G> {
        if self.crs.eq(crs) {
            Ok(&self.geometry)
        } else {
            Err(NdviError::UnsupportedCrs(format!(
                "{} (expected {})",
                self.crs, crs
            )))
        }
    }
}

impl<G: BoundingRect<f64>> CrsGeometry<G> {
    pub fn bounding_rect(&self) -> Option<CrsGeometry<Rect>> {
        let geometry = self.geometry.bounding_rect().into()?;
        Some(CrsGeometry {
            crs: self.crs.clone(),
            geometry,
        })
    }
}

impl<G: Intersection> Intersection for CrsGeometry<G> {
    type Output = CrsGeometry<G::Output>;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output> {
        let rhs = rhs.geometry_in(&self.crs)?;
        let geometry = self.geometry.intersection(rhs)?;
        Ok(CrsGeometry::new(self.crs.clone(), geometry))
    }
}
