//! Environment-sourced service configuration

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::Level;

use crate::error::{Error, Result};
use crate::gdal::ToolEnv;

/// What happens to the final raster once it exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkMode {
    /// Return the raster as the response body
    Respond,
    /// Upload the raster and return a JSON status
    Archive,
    /// Upload the raster, then return it as the response body
    RespondAndArchive,
}

impl SinkMode {
    pub fn archives(&self) -> bool {
        matches!(self, SinkMode::Archive | SinkMode::RespondAndArchive)
    }
}

/// How an upload failure affects a request in `respond-and-archive` mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UploadFailurePolicy {
    /// Fail the request with `UploadFailed`
    Fail,
    /// Log the failure and still return the raster
    Degrade,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "map-warper")]
#[command(author, version, about = "Georeference uploaded images with ground control points", long_about = None)]
pub struct Config {
    /// Listening port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listening address
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// gdal_translate executable
    #[arg(long, env = "GDAL_TRANSLATE_BIN", default_value = "gdal_translate")]
    pub translate_bin: PathBuf,

    /// gdalwarp executable
    #[arg(long, env = "GDALWARP_BIN", default_value = "gdalwarp")]
    pub warp_bin: PathBuf,

    /// GDAL support data directory handed to the tools as GDAL_DATA
    #[arg(long, env = "GDAL_DATA")]
    pub gdal_data: Option<PathBuf>,

    /// PROJ database directory handed to the tools as PROJ_DATA
    #[arg(long, env = "PROJ_DATA")]
    pub proj_data: Option<PathBuf>,

    /// Shared library directory handed to the tools as LD_LIBRARY_PATH
    #[arg(long, env = "GDAL_LIBRARY_PATH")]
    pub library_path: Option<PathBuf>,

    /// Parent directory for per-request scratch directories
    #[arg(long, env = "SCRATCH_DIR", default_value_os_t = std::env::temp_dir())]
    pub scratch_dir: PathBuf,

    #[arg(long, env = "SINK_MODE", value_enum, default_value_t = SinkMode::Respond)]
    pub sink_mode: SinkMode,

    #[arg(long, env = "UPLOAD_FAILURE_POLICY", value_enum, default_value_t = UploadFailurePolicy::Fail)]
    pub upload_failure_policy: UploadFailurePolicy,

    /// Bucket receiving archived rasters
    #[arg(long, env = "S3_BUCKET")]
    pub bucket: Option<String>,

    /// Prefix prepended to every object key
    #[arg(long, env = "S3_KEY_PREFIX", default_value = "")]
    pub key_prefix: String,

    /// S3-compatible endpoint; enables path-style addressing
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 100 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// trace, debug, info, warn or error
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: Level,
}

impl Config {
    /// Checks settings that would otherwise only fail on the first request
    pub fn validate(&self) -> Result<()> {
        if self.sink_mode.archives() && self.bucket.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config(format!(
                "sink mode {:?} requires S3_BUCKET",
                self.sink_mode
            )));
        }

        if !self.scratch_dir.is_dir() {
            return Err(Error::Config(format!(
                "scratch directory {} does not exist",
                self.scratch_dir.display()
            )));
        }

        // Probe writability now rather than on the first upload.
        tempfile::tempdir_in(&self.scratch_dir).map_err(|e| {
            Error::Config(format!(
                "scratch directory {} is not writable: {}",
                self.scratch_dir.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Environment overrides applied to every tool invocation
    pub fn tool_env(&self) -> ToolEnv {
        ToolEnv {
            gdal_data: self.gdal_data.clone(),
            proj_data: self.proj_data.clone(),
            library_path: self.library_path.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["map-warper"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_parse() {
        let config = parse(&[
            "--port",
            "8080",
            "--sink-mode",
            "respond-and-archive",
            "--upload-failure-policy",
            "degrade",
            "--bucket",
            "maps",
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.sink_mode, SinkMode::RespondAndArchive);
        assert_eq!(config.upload_failure_policy, UploadFailurePolicy::Degrade);
        assert_eq!(config.bucket.as_deref(), Some("maps"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_archive_requires_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let config = parse(&[
            "--sink-mode",
            "archive",
            "--bucket",
            "",
            "--scratch-dir",
            dir.path().to_str().unwrap(),
        ]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_scratch_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let config = parse(&["--scratch-dir", missing.to_str().unwrap()]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_respond_mode_needs_no_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let config = parse(&["--scratch-dir", dir.path().to_str().unwrap()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tool_env() {
        let config = parse(&["--gdal-data", "/var/task/data"]);
        let env = config.tool_env();
        assert_eq!(env.gdal_data, Some(PathBuf::from("/var/task/data")));
    }

    #[test]
    fn test_log_level_parsed_at_startup() {
        let config = parse(&["--log-level", "debug"]);
        assert_eq!(config.log_level, Level::DEBUG);

        let err = Config::try_parse_from(["map-warper", "--log-level", "loud"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
