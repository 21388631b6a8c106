//! Error types for map-warper

use std::io;

use thiserror::Error;

/// Result type for map-warper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while handling an upload
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed payload, bad base64, unusable file name or control point
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// gdal_translate could not be started or exited non-zero
    #[error("georeferencing failed: {stderr}")]
    GeoreferencingFailed { stderr: String },

    /// gdalwarp could not be started or exited non-zero
    #[error("reprojection failed: {stderr}")]
    ReprojectionFailed { stderr: String },

    /// Object storage rejected or never received the raster
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Scratch storage I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration, only raised at startup
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable name reported in error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::GeoreferencingFailed { .. } => "GeoreferencingFailed",
            Error::ReprojectionFailed { .. } => "ReprojectionFailed",
            Error::UploadFailed(_) => "UploadFailed",
            Error::Io(_) | Error::Config(_) => "Internal",
        }
    }
}
