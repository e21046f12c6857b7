//! `xeuspack build`: run the build step, then the task runner.

use std::path::PathBuf;

use anyhow::Result;

use xeuspack_core::addon::{AddonConfig, XeusAddon};
use xeuspack_core::task::TaskRunner;

pub struct BuildArgs {
    pub output_dir: String,
    pub packages: Vec<String>,
    pub kernel_version: Option<String>,
    pub filter_config: String,
    pub env_extensions: Option<String>,
    pub env_root: Option<String>,
}

pub fn cmd_build(args: BuildArgs) -> Result<()> {
    let output_dir = PathBuf::from(&args.output_dir);
    let addon = XeusAddon::new(AddonConfig {
        output_dir: output_dir.clone(),
        packages: args.packages,
        kernel_version: args.kernel_version,
        filter_config: args.filter_config,
        env_extensions: args.env_extensions.map(PathBuf::from),
        env_root: args.env_root.map(PathBuf::from),
    })?;

    let tasks = addon.post_build()?;
    if tasks.is_empty() {
        eprintln!("Nothing to do: no extra packages and no pre-bundled kernel extension found.");
        return Ok(());
    }

    let mut runner = TaskRunner::new(&output_dir);
    let summary = runner.run(&tasks)?;
    tracing::info!(
        executed = summary.executed,
        skipped = summary.skipped,
        "build complete"
    );
    eprintln!(
        "✓ Build complete: {} task(s) executed, {} up to date",
        summary.executed, summary.skipped
    );
    Ok(())
}
