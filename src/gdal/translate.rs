use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ControlPoint;

use super::{run_tool, ToolEnv};

/// Output driver for the intermediate raster
pub const OUTPUT_FORMAT: &str = "GTiff";

/// Builds the gdal_translate command line.
///
/// `-of GTiff`, then one `-gcp <row> <col> <lon> <lat>` group per control
/// point in request order, then the input and output paths.
pub fn translate_args(points: &[ControlPoint], input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(4 + points.len() * 5);
    args.push("-of".into());
    args.push(OUTPUT_FORMAT.into());

    for point in points {
        args.push("-gcp".into());
        args.extend(point.gcp_args().into_iter().map(OsString::from));
    }

    args.push(input.into());
    args.push(output.into());
    args
}

/// Tags `input` with ground control points, writing a GeoTIFF to `output`.
///
/// Zero control points is accepted and yields an unreferenced copy.
pub async fn georeference(
    program: &Path,
    env: &ToolEnv,
    points: &[ControlPoint],
    input: &Path,
    output: &Path,
) -> Result<PathBuf> {
    let args = translate_args(points, input, output);

    run_tool(program, &args, env)
        .await
        .map_err(|failure| Error::GeoreferencingFailed {
            stderr: failure.diagnostics,
        })?;

    Ok(output.to_path_buf())
}
