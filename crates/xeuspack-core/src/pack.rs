//! Invocation of the external `empack` environment packer.
//!
//! The packer turns a filtered environment prefix into a loader script plus
//! a data blob (`<outname>.js` / `<outname>.data`). It is consumed as a
//! black box: one blocking call, non-zero exit is fatal.

use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;

pub const EMPACK_EXECUTABLE: &str = "empack";

/// JavaScript symbol the loader script attaches the runtime module to.
pub const EXPORT_NAME: &str = "globalThis.Module";

#[derive(Debug, Error)]
pub enum PackError {
    #[error("empack executable not found on PATH")]
    NotFound,
    #[error("empack exited with status {code}: {stderr}")]
    Failed { code: i32, stderr: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Whether the packer executable is present on the search path.
pub fn empack_available() -> bool {
    Command::new(EMPACK_EXECUTABLE)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Pack the environment at `prefix` into `<outname>.js` / `<outname>.data`,
/// keeping only the files selected by the ruleset at `config`.
pub fn pack_environment(prefix: &Path, outname: &Path, config: &Path) -> Result<(), PackError> {
    tracing::info!(prefix = %prefix.display(), "packing environment");
    let result = Command::new(EMPACK_EXECUTABLE)
        .args(["pack", "env"])
        .arg("--env-prefix")
        .arg(prefix)
        .arg("--outname")
        .arg(outname)
        .arg("--config")
        .arg(config)
        .args(["--export-name", EXPORT_NAME])
        .output();

    let output = match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(PackError::NotFound),
        other => other?,
    };
    if !output.status.success() {
        return Err(PackError::Failed {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
