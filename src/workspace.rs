//! Per-request scratch directories
//!
//! Every request writes its input, intermediate and final rasters into its own
//! directory. The directory is removed when the [`Workspace`] is dropped, which
//! covers success, early failure and a cancelled request future alike.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::error::Result;

/// Scratch directory owned by a single request
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    request_id: Uuid,
}

impl Workspace {
    /// Creates a fresh, uniquely named directory under `root`
    pub fn create(root: &Path, request_id: Uuid) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("map-warper-{}-", request_id))
            .tempdir_in(root)?;

        Ok(Self { dir, request_id })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Decoded upload, keeping the original extension so GDAL picks the right driver
    pub fn input_path(&self, extension: &str) -> PathBuf {
        self.dir.path().join(format!("input.{}", extension))
    }

    /// GCP-tagged GeoTIFF written by gdal_translate
    pub fn intermediate_path(&self) -> PathBuf {
        self.dir.path().join("translated.tif")
    }

    /// Reprojected GeoTIFF written by gdalwarp
    pub fn final_path(&self) -> PathBuf {
        self.dir.path().join(format!("{}.tif", self.request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_inside_workspace() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let ws = Workspace::create(root.path(), id).unwrap();

        assert!(ws.path().starts_with(root.path()));
        assert_eq!(ws.input_path("png").file_name().unwrap(), "input.png");
        assert_eq!(ws.intermediate_path().parent().unwrap(), ws.path());
        assert_eq!(
            ws.final_path().file_name().unwrap().to_str().unwrap(),
            format!("{}.tif", id)
        );
    }

    #[test]
    fn test_distinct_requests_get_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(root.path(), Uuid::new_v4()).unwrap();
        let b = Workspace::create(root.path(), Uuid::new_v4()).unwrap();
        assert_ne!(a.path(), b.path());
        assert_ne!(a.final_path(), b.final_path());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), Uuid::new_v4()).unwrap();
        std::fs::write(ws.input_path("jpg"), b"data").unwrap();
        let path = ws.path().to_path_buf();

        drop(ws);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
