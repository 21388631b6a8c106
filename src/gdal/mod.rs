//! External GDAL tool invocation
//!
//! Georeferencing and reprojection are delegated to `gdal_translate` and
//! `gdalwarp`. This module builds their argument lists and runs them as child
//! processes; their exit status is the only success signal.

pub mod translate;
pub mod warp;

pub use translate::{georeference, translate_args};
pub use warp::{reproject, warp_args, TARGET_SRS};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Environment overrides for a tool child process.
///
/// Applied per invocation so that handling one request never changes the
/// server's own environment.
#[derive(Debug, Clone, Default)]
pub struct ToolEnv {
    /// Exported as `GDAL_DATA`
    pub gdal_data: Option<PathBuf>,
    /// Exported as `PROJ_DATA` and `PROJ_LIB`
    pub proj_data: Option<PathBuf>,
    /// Exported as `LD_LIBRARY_PATH`
    pub library_path: Option<PathBuf>,
}

impl ToolEnv {
    fn vars(&self) -> Vec<(&'static str, &Path)> {
        let mut vars = Vec::new();
        if let Some(dir) = &self.gdal_data {
            vars.push(("GDAL_DATA", dir.as_path()));
        }
        if let Some(dir) = &self.proj_data {
            vars.push(("PROJ_DATA", dir.as_path()));
            vars.push(("PROJ_LIB", dir.as_path()));
        }
        if let Some(dir) = &self.library_path {
            vars.push(("LD_LIBRARY_PATH", dir.as_path()));
        }
        vars
    }
}

/// Captured output of a successful tool run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Diagnostics from a tool that failed to start or exited non-zero
#[derive(Debug, Clone)]
pub struct ToolFailure {
    pub diagnostics: String,
}

/// Runs `program` with `args`, capturing stdout and stderr separately.
///
/// The child is killed if the returned future is dropped before it exits.
pub async fn run_tool(
    program: &Path,
    args: &[OsString],
    env: &ToolEnv,
) -> std::result::Result<ToolOutput, ToolFailure> {
    tracing::debug!(program = %program.display(), ?args, "running tool");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in env.vars() {
        cmd.env(key, value);
    }

    let output = cmd.output().await.map_err(|e| ToolFailure {
        diagnostics: format!("failed to start {}: {}", program.display(), e),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !stdout.trim().is_empty() {
        tracing::debug!(program = %program.display(), stdout = %stdout.trim(), "tool stdout");
    }

    if !output.status.success() {
        tracing::warn!(
            program = %program.display(),
            status = %output.status,
            stderr = %stderr.trim(),
            "tool failed"
        );
        let diagnostics = if stderr.trim().is_empty() {
            format!("{} exited with {}", program.display(), output.status)
        } else {
            stderr.trim().to_string()
        };
        return Err(ToolFailure { diagnostics });
    }

    Ok(ToolOutput { stdout, stderr })
}
