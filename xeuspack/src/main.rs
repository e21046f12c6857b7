mod cli;
mod commands;
mod config;
mod observability;

use anyhow::Result;
use clap::Parser;

use cli::{split_packages, Cli, Commands};

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            output_dir,
            packages,
            kernel_version,
            filter_config,
            env_extensions,
            env_root,
        } => commands::build::cmd_build(commands::build::BuildArgs {
            output_dir,
            packages: split_packages(packages.as_deref()),
            kernel_version,
            filter_config,
            env_extensions,
            env_root,
        }),
        Commands::Doctor => commands::doctor::cmd_doctor(),
        Commands::Clean { env_root } => commands::clean::cmd_clean(env_root),
    }
}
