//! The on-disk environment prefix for one provisioning pass.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name of the root prefix under the system temp dir.
pub const ROOT_PREFIX_NAME: &str = "xeus-python-kernel";

/// Name of the environment created under `<root>/envs/`.
pub const ENV_NAME: &str = "xeus-python-kernel";

/// Owns the root prefix directory holding one isolated environment.
///
/// Stale `envs/` content from a prior run is removed at construction, and
/// again when the value is dropped, so a build always starts from and leaves
/// behind a clean slate.
pub struct EnvPrefix {
    root: PathBuf,
}

impl EnvPrefix {
    /// Root prefix at the default location under the system temp dir.
    pub fn new() -> Result<Self> {
        Self::at(std::env::temp_dir().join(ROOT_PREFIX_NAME))
    }

    /// Root prefix at an explicit location.
    pub fn at(root: PathBuf) -> Result<Self> {
        // Idempotent cleanup of a stale prior run
        let _ = fs::remove_dir_all(root.join("envs"));
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create env root: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env_name(&self) -> &str {
        ENV_NAME
    }

    /// The environment prefix itself: `<root>/envs/<name>`.
    pub fn path(&self) -> PathBuf {
        self.root.join("envs").join(ENV_NAME)
    }

    /// Where the package managers place executables inside the prefix.
    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }
}

impl Drop for EnvPrefix {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(self.root.join("envs"));
    }
}

/// Remove an environment root entirely. Missing root is not an error.
pub fn clean_root(root: &Path) -> Result<()> {
    if !root.exists() {
        return Ok(());
    }
    fs::remove_dir_all(root)
        .with_context(|| format!("Failed to remove env root: {}", root.display()))
}
