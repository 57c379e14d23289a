use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Invalid EPSG code: {0:?}")]
    InvalidEpsgCode(String),

    #[error("Cannot transform geometries without a defined CRS")]
    UndefinedCrs,

    #[error("No vector layer found in {0:?}")]
    NoLayer(PathBuf),

    #[error("Record {row} has {found} values, expected {expected}")]
    RecordShape {
        row: usize,
        expected: usize,
        found: usize,
    },
}
