//! The build step: provision the wasm kernel environment and yield the
//! copy/patch tasks that assemble the output tree.
//!
//! One linear pass per build:
//!   1. copy the pre-bundled kernel extension from the host, if present
//!   2. bail early when no extra packages and no version override were
//!      requested (the pre-bundled runtime is all the consumer wants)
//!   3. create the emscripten-32 environment
//!   4. resolve the file-filter ruleset
//!   5. pack the environment into loader + data artifacts
//!   6. harvest extensions bundled inside the new environment
//!   7. schedule the fixed runtime artifact copies
//!   8. schedule the bundle-manifest patch, last
//!
//! Steps 3 to 5 execute eagerly; everything else is yielded as tasks for
//! the runner to order and skip.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::env::{install_specs, EnvPrefix, Provisioner};
use crate::extensions::{
    copy_extension_task, copy_overwriting, discover_extensions, SHARE_LABEXTENSIONS,
};
use crate::filter::PackageFilter;
use crate::manifest::{patch_bundle_manifest, JUPYTERLITE_JSON};
use crate::pack;
use crate::task::Task;

/// The kernel's own front-end extension, shipped pre-bundled by the host.
pub const KERNEL_EXTENSION: &str = "@jupyterlite/xeus-python-kernel";

/// Extensions directory inside the output tree.
pub const LAB_EXTENSIONS_DIR: &str = "extensions";

/// Static-assets directory inside the kernel extension.
pub const STATIC_DIR: &str = "static";

/// Packed runtime pair the packer leaves in the staging dir.
pub const PYTHON_DATA_FILES: &[&str] = &["python_data.js", "python_data.data"];

/// Interpreter loader/binary pair from the environment's bin dir.
pub const WASM_FILES: &[&str] = &["xpython_wasm.js", "xpython_wasm.wasm"];

/// Everything the build step needs to know, resolved by the CLI layer.
pub struct AddonConfig {
    /// Root of the JupyterLite output tree.
    pub output_dir: PathBuf,
    /// Extra packages to install into the kernel environment.
    pub packages: Vec<String>,
    /// Kernel version override; `None` leaves the version unpinned.
    pub kernel_version: Option<String>,
    /// URL or local path of the filter ruleset.
    pub filter_config: String,
    /// Host directory holding pre-bundled extensions, if any.
    pub env_extensions: Option<PathBuf>,
    /// Override for the environment root prefix.
    pub env_root: Option<PathBuf>,
}

/// One build pass. Owns the environment prefix and the packer staging
/// directory, so both outlive the yielded tasks until the pass is dropped.
pub struct XeusAddon {
    config: AddonConfig,
    prefix: EnvPrefix,
    staging: TempDir,
}

impl XeusAddon {
    pub fn new(config: AddonConfig) -> Result<Self> {
        let prefix = match &config.env_root {
            Some(root) => EnvPrefix::at(root.clone())?,
            None => EnvPrefix::new()?,
        };
        let staging = TempDir::new().context("Failed to create staging directory")?;
        Ok(Self {
            config,
            prefix,
            staging,
        })
    }

    pub fn output_extensions(&self) -> PathBuf {
        self.config.output_dir.join(LAB_EXTENSIONS_DIR)
    }

    pub fn bundle_manifest_path(&self) -> PathBuf {
        self.config.output_dir.join(JUPYTERLITE_JSON)
    }

    /// Assemble the ordered task list for this pass.
    pub fn post_build(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        let output_extensions = self.output_extensions();

        // 1. The host may already ship the kernel extension; copy it first
        if let Some(ref root) = self.config.env_extensions {
            for manifest in discover_extensions(root)? {
                if manifest.name == KERNEL_EXTENSION {
                    tasks.push(copy_extension_task(&manifest, &output_extensions)?);
                }
            }
        }

        // 2. Nothing else to do when only the pre-bundled runtime is wanted
        if self.config.packages.is_empty() && self.config.kernel_version.is_none() {
            tracing::debug!("no extra packages requested, skipping environment build");
            return Ok(tasks);
        }

        // 3. Create the environment
        let provisioner = Provisioner::detect()?;
        tracing::info!(
            backend = %provisioner.backend(),
            prefix = %self.prefix.path().display(),
            "creating emscripten-32 environment"
        );
        let specs = install_specs(
            self.config.kernel_version.as_deref(),
            &self.config.packages,
        );
        provisioner.create_environment(&self.prefix, &specs)?;

        // 4. Resolve the filter ruleset and materialize it for the packer
        let filter = PackageFilter::load(&self.config.filter_config)?;
        tracing::debug!(
            package_rules = filter.package_rule_count(),
            "filter ruleset loaded"
        );
        let filter_path = self.staging.path().join("empack_config.yaml");
        filter.write_to(&filter_path)?;

        // 5. Pack
        pack::pack_environment(
            &self.prefix.path(),
            &self.staging.path().join("python_data"),
            &filter_path,
        )?;

        // 6. Extensions bundled inside the new environment
        let env_share = self.prefix.path().join(SHARE_LABEXTENSIONS);
        for manifest in discover_extensions(&env_share)? {
            tasks.push(copy_extension_task(&manifest, &output_extensions)?);
        }

        // 7. Fixed runtime artifacts into the kernel extension's static dir
        let static_dest = output_extensions.join(KERNEL_EXTENSION).join(STATIC_DIR);
        for file in PYTHON_DATA_FILES {
            tasks.push(copy_file_task(
                self.staging.path().join(file),
                static_dest.join(file),
            ));
        }
        for file in WASM_FILES {
            tasks.push(copy_file_task(
                self.prefix.bin_dir().join(file),
                static_dest.join(file),
            ));
        }

        // 8. Patch the bundle manifest once every copy has landed
        tasks.push(self.patch_task()?);

        Ok(tasks)
    }

    fn patch_task(&self) -> Result<Task> {
        let manifest_path = self.bundle_manifest_path();
        let output_extensions = self.output_extensions();
        let mut deps: Vec<PathBuf> = discover_extensions(&output_extensions)?
            .into_iter()
            .map(|m| m.path)
            .collect();
        deps.push(manifest_path.clone());

        Ok(Task::new("patch:xeus")
            .doc(format!(
                "ensure {} includes the federated_extensions",
                JUPYTERLITE_JSON
            ))
            .deps(deps)
            .action(move || patch_bundle_manifest(&manifest_path, &output_extensions)))
    }
}

fn copy_file_task(src: PathBuf, dest: PathBuf) -> Task {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| src.to_string_lossy().to_string());
    Task::new(format!("xeus:copy:{}", name))
        .dep(src.clone())
        .action(move || copy_overwriting(&src, &dest))
}
