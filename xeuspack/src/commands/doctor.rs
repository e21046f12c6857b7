//! `xeuspack doctor`: report which external tools a build would use.

use anyhow::Result;

use xeuspack_core::env::backend::detect_backend;
use xeuspack_core::pack;

pub fn cmd_doctor() -> Result<()> {
    match detect_backend() {
        Some(backend) => eprintln!("✓ package manager: {}", backend),
        None => eprintln!("✗ package manager: none of mamba, micromamba, conda found"),
    }
    if pack::empack_available() {
        eprintln!("✓ packer: {}", pack::EMPACK_EXECUTABLE);
    } else {
        eprintln!("✗ packer: {} not found on PATH", pack::EMPACK_EXECUTABLE);
    }
    Ok(())
}
