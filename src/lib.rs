//! map-warper - georeference uploaded images with ground control points
//!
//! An uploaded image is tagged with its control points by `gdal_translate`,
//! reprojected to WGS84 (EPSG:4326) by `gdalwarp`, and then either returned
//! to the caller, archived to an S3 bucket, or both.
//!
//! # Examples
//!
//! ## Running the pipeline directly
//!
//! ```no_run
//! use clap::Parser;
//! use map_warper::{Config, ControlPoint, Pipeline, UploadRequest};
//!
//! # async fn run() -> map_warper::Result<()> {
//! let config = Config::parse();
//! let pipeline = Pipeline::from_config(&config)?;
//!
//! let request = UploadRequest {
//!     points: vec![
//!         ControlPoint::new(0, 0, 40.0, -74.0),
//!         ControlPoint::new(100, 50, 40.001, -73.999),
//!     ],
//!     filename: "photo.png".to_string(),
//!     image_base64: "iVBORw0KGgo=".to_string(),
//! };
//!
//! let outcome = pipeline.run(uuid::Uuid::new_v4(), request).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod gdal;
pub mod pipeline;
pub mod sink;
pub mod storage;
pub mod types;
pub mod workspace;

pub use config::{Config, SinkMode, UploadFailurePolicy};
pub use error::{Error, Result};
pub use pipeline::{DecodedUpload, Pipeline, Tools};
pub use sink::{ArchiveStatus, Outcome, Sink};
pub use storage::{ArchivedObject, AwsCredentials, S3Store};
pub use types::{ControlPoint, GeoCoord, PixelCoord, UploadRequest};
pub use workspace::Workspace;

/// Content type of the GeoTIFF rasters produced by the pipeline
pub const TIFF_MIME: &str = "image/tiff";
