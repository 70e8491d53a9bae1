use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, NdviError>;

#[derive(thiserror::Error, Debug)]
pub enum NdviError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("failed to write {path}")]
    Export {
        path: PathBuf,
        #[source]
        source: ExportError,
    },
    #[error("band {band} not found in scene {scene}")]
    MissingBand { scene: String, band: String },
    #[error("bands of scene {scene} do not share a grid")]
    GridMismatch { scene: String },
    #[error("unsupported crs {0}, only EPSG:4326 is handled")]
    UnsupportedCrs(String),
    #[error("geo transform is not invertible")]
    NonInvertibleTransform,
    #[error("there is no intersection between geometries")]
    NoIntersection,
    #[error("malformed {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    TiffError(#[from] tiff::TiffError),
    #[cfg(feature = "gdal")]
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
    #[error(transparent)]
    NdarrayError(#[from] ndarray::ShapeError),
    #[error(transparent)]
    YamlError(#[from] serde_yaml::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Failures while serializing workflow outputs.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NdviError {
    pub fn export(path: impl Into<PathBuf>, source: impl Into<ExportError>) -> Self {
        NdviError::Export {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        NdviError::Configuration(reason.into())
    }
}

/// A year whose composite carries no data.
///
/// Reported as a warning alongside the workflow output, never returned as an error.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[error("no usable data for {year}: {reason}")]
pub struct DataGap {
    pub year: i32,
    pub reason: String,
}
