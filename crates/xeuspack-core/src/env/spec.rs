//! Install specs and channels for the kernel environment.

/// Python version pinned into every environment.
pub const PYTHON_VERSION: &str = "3.10";

/// The kernel package providing the wasm interpreter.
pub const KERNEL_PACKAGE: &str = "xeus-python";

/// Channels in resolution-priority order: emscripten-forge first so the
/// wasm builds shadow the regular conda-forge ones.
pub const CHANNELS: &[&str] = &[
    "https://repo.mamba.pm/emscripten-forge",
    "https://repo.mamba.pm/conda-forge",
];

/// Target platform identifier for package selection.
pub const PLATFORM: &str = "emscripten-32";

/// Build the full install-spec list for one environment.
///
/// The interpreter spec always comes first, the kernel spec second
/// (pinned when `kernel_version` is given), then the user packages in
/// their original order.
pub fn install_specs(kernel_version: Option<&str>, packages: &[String]) -> Vec<String> {
    let mut specs = Vec::with_capacity(packages.len() + 2);
    specs.push(format!("python={}", PYTHON_VERSION));
    specs.push(match kernel_version {
        Some(version) => format!("{}={}", KERNEL_PACKAGE, version),
        None => KERNEL_PACKAGE.to_string(),
    });
    specs.extend(packages.iter().cloned());
    specs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specs_start_with_python_then_kernel() {
        let packages = vec!["numpy".to_string(), "matplotlib=3.7".to_string()];
        let specs = install_specs(None, &packages);
        assert_eq!(specs[0], "python=3.10");
        assert_eq!(specs[1], "xeus-python");
        assert_eq!(&specs[2..], &["numpy", "matplotlib=3.7"]);
    }

    #[test]
    fn test_kernel_version_override_is_pinned() {
        let specs = install_specs(Some("0.9.2"), &[]);
        assert_eq!(specs, vec!["python=3.10", "xeus-python=0.9.2"]);
    }

    #[test]
    fn test_package_order_preserved() {
        let packages: Vec<String> = ["c", "a", "b"].iter().map(|s| s.to_string()).collect();
        let specs = install_specs(None, &packages);
        assert_eq!(&specs[2..], &["c", "a", "b"]);
    }

    #[test]
    fn test_channel_priority_order() {
        assert_eq!(CHANNELS.len(), 2);
        assert!(CHANNELS[0].ends_with("emscripten-forge"));
        assert!(CHANNELS[1].ends_with("conda-forge"));
    }
}
