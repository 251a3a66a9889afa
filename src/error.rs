use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No feature found in {0}. Check the submitted area of interest and try again")]
    EmptyInput(PathBuf),

    #[error("Number of vertices ({count}) exceeds {limit}, reduce vertices and try again")]
    TooManyVertices { count: usize, limit: usize },

    #[error("Submitted AOI area ({area:.3} m²) is smaller than 1 square meter, submit a larger AOI and try again")]
    AreaTooSmall { area: f64 },

    #[error("Unsupported AOI file format: {0} (expected .shp, .kml, .json or .geojson)")]
    UnsupportedFormat(PathBuf),

    #[error("Unsupported geometry type in AOI: {0}")]
    UnsupportedGeometry(String),

    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    #[error("Could not read AOI file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        source: gdal::errors::GdalError,
    },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Start date {start} has to be before end date {end}")]
    DateOrder { start: String, end: String },

    #[error("No scenes matched the search")]
    NoScenesFound,

    #[error("Request failed with status {status}: {body}")]
    Transport { status: StatusCode, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl Error {
    /// True for errors caused by the user's input rather than the provider or the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput(_)
                | Self::TooManyVertices { .. }
                | Self::AreaTooSmall { .. }
                | Self::UnsupportedFormat(_)
                | Self::UnsupportedGeometry(_)
                | Self::UnsupportedCrs(_)
                | Self::Unreadable { .. }
                | Self::InvalidDate(_)
                | Self::DateOrder { .. }
                | Self::NoScenesFound
        )
    }
}
