//! `xeuspack clean`: remove the environment root left by previous builds.

use std::path::PathBuf;

use anyhow::Result;

use xeuspack_core::env::prefix::{clean_root, ROOT_PREFIX_NAME};

pub fn cmd_clean(env_root: Option<String>) -> Result<()> {
    let root = env_root
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(ROOT_PREFIX_NAME));
    clean_root(&root)?;
    eprintln!("✓ Removed {}", root.display());
    Ok(())
}
