use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{run_tool, ToolEnv};

/// Target coordinate reference system (WGS84 geographic)
pub const TARGET_SRS: &str = "EPSG:4326";

/// Builds the gdalwarp command line: `-t_srs EPSG:4326 <input> <output>`
pub fn warp_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-t_srs".into(),
        TARGET_SRS.into(),
        input.into(),
        output.into(),
    ]
}

/// Reprojects the GCP-tagged raster at `input` into [`TARGET_SRS`]
pub async fn reproject(program: &Path, env: &ToolEnv, input: &Path, output: &Path) -> Result<PathBuf> {
    let args = warp_args(input, output);

    run_tool(program, &args, env)
        .await
        .map_err(|failure| Error::ReprojectionFailed {
            stderr: failure.diagnostics,
        })?;

    Ok(output.to_path_buf())
}
