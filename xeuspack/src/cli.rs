use clap::{Parser, Subcommand};

use xeuspack_core::filter::DEFAULT_FILTER_CONFIG;

/// xeuspack: bundle a WebAssembly xeus-python kernel into a JupyterLite site
#[derive(Parser, Debug)]
#[command(name = "xeuspack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the kernel environment and copy its artifacts into the site
    Build {
        /// Path to the JupyterLite output tree
        #[arg(long, value_name = "DIR", env = "XEUSPACK_OUTPUT_DIR")]
        output_dir: String,

        /// Comma-separated extra packages to install in the kernel env
        #[arg(long, value_name = "PKGS", env = "XEUSPACK_PACKAGES")]
        packages: Option<String>,

        /// xeus-python version to pin (default: unpinned)
        #[arg(long, value_name = "VERSION", env = "XEUSPACK_KERNEL_VERSION")]
        kernel_version: Option<String>,

        /// URL or local path of the empack filter config
        #[arg(
            long,
            value_name = "SRC",
            env = "XEUSPACK_FILTER_CONFIG",
            default_value = DEFAULT_FILTER_CONFIG
        )]
        filter_config: String,

        /// Directory holding the host's pre-bundled labextensions
        #[arg(long, value_name = "DIR", env = "XEUSPACK_ENV_EXTENSIONS")]
        env_extensions: Option<String>,

        /// Override the environment root prefix (default: system temp dir)
        #[arg(long, value_name = "DIR", env = "XEUSPACK_ENV_ROOT")]
        env_root: Option<String>,
    },

    /// Report which package-manager backend and packer are available
    Doctor,

    /// Remove the environment root left behind by previous builds
    Clean {
        /// Environment root prefix to remove (default: system temp dir)
        #[arg(long, value_name = "DIR", env = "XEUSPACK_ENV_ROOT")]
        env_root: Option<String>,
    },
}

/// Split a comma-separated package list, dropping empty segments.
pub fn split_packages(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_packages() {
        assert_eq!(
            split_packages(Some("numpy, matplotlib=3.7,scipy")),
            vec!["numpy", "matplotlib=3.7", "scipy"]
        );
        assert!(split_packages(Some("")).is_empty());
        assert!(split_packages(Some(" , ")).is_empty());
        assert!(split_packages(None).is_empty());
    }
}
