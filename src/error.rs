use thiserror::Error;

use crate::model::ObjectId;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Degenerate bounding box: {0}")]
    DegenerateBox(String),

    #[error("Grid size must be between 1 and {max}, got {0}", max = crate::geometry::MAX_GRID_SIZE)]
    InvalidGridSize(u32),

    #[error("Failed to parse bounding box: {0}")]
    ParseError(String),

    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),
}

/// Errors for a single unit of remote work (one tile or one object id)
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {status}")]
    HttpStatus { status: u16 },

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Object {0} is not in the cache")]
    NotCached(ObjectId),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::HttpStatus { status: status.as_u16() },
            None => FetchError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Payload(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt cache file {path}: {message}")]
    Corrupt { path: String, message: String },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse geometry: {0}")]
    Geometry(String),
}
