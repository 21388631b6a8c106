//! Delivery of the final raster: response body, bucket, or both

use std::path::Path;

use bytes::Bytes;

use crate::config::{SinkMode, UploadFailurePolicy};
use crate::error::{Error, Result};
use crate::storage::{ArchivedObject, S3Store};

/// What became of the archive copy when the raster is also returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// Sink mode does not archive
    Skipped,
    Stored(ArchivedObject),
    /// Upload failed and the degrade policy kept the request alive
    Failed(String),
}

/// Result of a completed request
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Raster bytes to return to the caller
    Raster {
        bytes: Bytes,
        download_name: String,
        archive: ArchiveStatus,
    },
    /// Upload-only mode: the raster lives in the bucket
    Archived(ArchivedObject),
}

#[derive(Debug, Clone)]
pub struct Sink {
    mode: SinkMode,
    policy: UploadFailurePolicy,
    store: Option<S3Store>,
}

impl Sink {
    pub fn new(mode: SinkMode, policy: UploadFailurePolicy, store: Option<S3Store>) -> Self {
        Self { mode, policy, store }
    }

    fn store(&self) -> Result<&S3Store> {
        self.store
            .as_ref()
            .ok_or_else(|| Error::UploadFailed("no bucket configured".to_string()))
    }

    /// Hands `final_path` to the configured destination.
    ///
    /// In `archive` mode any upload failure fails the request, since nothing
    /// else would be returned. In `respond-and-archive` mode the failure
    /// policy decides.
    pub async fn deliver(&self, final_path: &Path, download_name: String) -> Result<Outcome> {
        match self.mode {
            SinkMode::Respond => {
                let bytes = tokio::fs::read(final_path).await?;
                Ok(Outcome::Raster {
                    bytes: Bytes::from(bytes),
                    download_name,
                    archive: ArchiveStatus::Skipped,
                })
            }
            SinkMode::Archive => {
                let object = self.store()?.put_file(final_path).await?;
                tracing::info!(bucket = %object.bucket, key = %object.key, "raster archived");
                Ok(Outcome::Archived(object))
            }
            SinkMode::RespondAndArchive => {
                let bytes = Bytes::from(tokio::fs::read(final_path).await?);
                let uploaded = match self.store() {
                    Ok(store) => match store.object_key(final_path) {
                        Ok(key) => store.put_bytes(key, bytes.clone()).await,
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                };

                let archive = match uploaded {
                    Ok(object) => {
                        tracing::info!(bucket = %object.bucket, key = %object.key, "raster archived");
                        ArchiveStatus::Stored(object)
                    }
                    Err(e) => match self.policy {
                        UploadFailurePolicy::Fail => return Err(e),
                        UploadFailurePolicy::Degrade => {
                            tracing::warn!(error = %e, "archive upload failed, returning raster anyway");
                            ArchiveStatus::Failed(e.to_string())
                        }
                    },
                };

                Ok(Outcome::Raster {
                    bytes,
                    download_name,
                    archive,
                })
            }
        }
    }
}
