//! Request orchestration: decode, georeference, reproject, deliver.
//!
//! Each stage consumes the previous stage's file, so a request runs strictly
//! in sequence and stops at the first failure. All files live in a
//! [`Workspace`] that is removed when [`Pipeline::run`] returns or its future
//! is dropped.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gdal::{self, ToolEnv};
use crate::sink::{Outcome, Sink};
use crate::storage::S3Store;
use crate::types::{download_stem, file_extension, ControlPoint, UploadRequest};
use crate::workspace::Workspace;

/// A validated upload, ready to be written to disk
#[derive(Debug, Clone)]
pub struct DecodedUpload {
    pub points: Vec<ControlPoint>,
    pub extension: String,
    pub stem: String,
    pub bytes: Vec<u8>,
}

impl DecodedUpload {
    /// Validates and decodes a request without touching the filesystem
    pub fn from_request(request: UploadRequest) -> Result<Self> {
        for point in &request.points {
            point.geo.validate()?;
        }

        let bytes = BASE64
            .decode(request.image_base64.trim())
            .map_err(|e| Error::InvalidRequest(format!("imageBase64 is not valid base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(Error::InvalidRequest("imageBase64 decodes to no data".to_string()));
        }

        let extension = file_extension(&request.filename)?;

        Ok(Self {
            points: request.points,
            extension,
            stem: download_stem(&request.filename),
            bytes,
        })
    }
}

/// Settings for the georeferencing and reprojection tools
#[derive(Debug, Clone)]
pub struct Tools {
    pub translate_bin: PathBuf,
    pub warp_bin: PathBuf,
    pub env: ToolEnv,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    tools: Tools,
    scratch_dir: PathBuf,
    sink: Sink,
}

impl Pipeline {
    pub fn new(tools: Tools, scratch_dir: PathBuf, sink: Sink) -> Self {
        Self {
            tools,
            scratch_dir,
            sink,
        }
    }

    /// Builds the pipeline, including the shared S3 handle when archiving
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = match (&config.bucket, config.sink_mode.archives()) {
            (Some(bucket), true) => Some(S3Store::new(
                bucket.clone(),
                config.key_prefix.clone(),
                config.s3_endpoint.clone(),
            )?),
            _ => None,
        };

        let tools = Tools {
            translate_bin: config.translate_bin.clone(),
            warp_bin: config.warp_bin.clone(),
            env: config.tool_env(),
        };

        Ok(Self::new(
            tools,
            config.scratch_dir.clone(),
            Sink::new(config.sink_mode, config.upload_failure_policy, store),
        ))
    }

    /// Runs one upload end to end
    pub async fn run(&self, request_id: Uuid, request: UploadRequest) -> Result<Outcome> {
        let span = tracing::info_span!("upload", %request_id, filename = %request.filename);
        self.run_stages(request_id, request).instrument(span).await
    }

    async fn run_stages(&self, request_id: Uuid, request: UploadRequest) -> Result<Outcome> {
        let upload = DecodedUpload::from_request(request)?;
        tracing::info!(points = upload.points.len(), bytes = upload.bytes.len(), "upload accepted");

        let workspace = Workspace::create(&self.scratch_dir, request_id)?;
        let input = workspace.input_path(&upload.extension);
        tokio::fs::write(&input, &upload.bytes).await?;

        let intermediate = gdal::georeference(
            &self.tools.translate_bin,
            &self.tools.env,
            &upload.points,
            &input,
            &workspace.intermediate_path(),
        )
        .await?;

        let final_path = gdal::reproject(
            &self.tools.warp_bin,
            &self.tools.env,
            &intermediate,
            &workspace.final_path(),
        )
        .await?;

        let outcome = self
            .sink
            .deliver(&final_path, format!("{}.tif", upload.stem))
            .await?;

        tracing::info!("upload complete");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(filename: &str, image: &str) -> UploadRequest {
        UploadRequest {
            points: vec![ControlPoint::new(0, 0, 40.0, -74.0)],
            filename: filename.to_string(),
            image_base64: image.to_string(),
        }
    }

    #[test]
    fn test_decode_valid_upload() {
        let upload = DecodedUpload::from_request(request("photo.PNG", "aGVsbG8=")).unwrap();
        assert_eq!(upload.bytes, b"hello");
        assert_eq!(upload.extension, "png");
        assert_eq!(upload.stem, "photo");
        assert_eq!(upload.points.len(), 1);
    }

    #[test]
    fn test_bad_base64_is_invalid_request() {
        let err = DecodedUpload::from_request(request("photo.png", "not base64!!")).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_empty_image_is_invalid_request() {
        let err = DecodedUpload::from_request(request("photo.png", "")).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_extension_is_invalid_request() {
        let err = DecodedUpload::from_request(request("photo", "aGVsbG8=")).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_out_of_range_point_is_invalid_request() {
        let mut req = request("photo.png", "aGVsbG8=");
        req.points.push(ControlPoint::new(1, 1, 95.0, 0.0));
        let err = DecodedUpload::from_request(req).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_invalid_request_touches_no_files() {
        let scratch = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Tools {
                translate_bin: PathBuf::from("/nonexistent/gdal_translate"),
                warp_bin: PathBuf::from("/nonexistent/gdalwarp"),
                env: ToolEnv::default(),
            },
            scratch.path().to_path_buf(),
            Sink::new(
                crate::config::SinkMode::Respond,
                crate::config::UploadFailurePolicy::Fail,
                None,
            ),
        );

        let err = pipeline.run(Uuid::new_v4(), request("photo", "aGVsbG8=")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_launch_failure_cleans_up_workspace() {
        let scratch = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Tools {
                translate_bin: PathBuf::from("/nonexistent/gdal_translate"),
                warp_bin: PathBuf::from("/nonexistent/gdalwarp"),
                env: ToolEnv::default(),
            },
            scratch.path().to_path_buf(),
            Sink::new(
                crate::config::SinkMode::Respond,
                crate::config::UploadFailurePolicy::Fail,
                None,
            ),
        );

        let err = pipeline.run(Uuid::new_v4(), request("photo.png", "aGVsbG8=")).await.unwrap_err();
        assert!(matches!(err, Error::GeoreferencingFailed { .. }));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
