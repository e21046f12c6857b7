//! Package-manager backend selection and environment creation.
//!
//! # Backend priority
//!
//! 1. **mamba**: fast general-purpose executable. Two-phase create+install
//!    with a `.condarc` pinning the package subdir to the target platform.
//! 2. **micromamba**: lightweight standalone executable. Creation and
//!    installation in a single invocation; the platform is passed as a
//!    command-line flag, no config file needed.
//! 3. **conda**: general-purpose executable, same two-phase shape as mamba.
//!
//! Availability is probed once per [`Provisioner`] and cached. The platform
//! pin for the two-phase backends is threaded into each child process via
//! `CONDARC` on that process only; nothing process-wide is mutated.

use std::fmt;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;

use super::prefix::EnvPrefix;
use super::spec::{CHANNELS, PLATFORM};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("no usable package manager found; install mamba, micromamba or conda")]
    NoBackend,
    #[error("{tool} exited with status {code}: {stderr}")]
    CommandFailed {
        tool: &'static str,
        code: i32,
        stderr: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The conda-family tools this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Mamba,
    Micromamba,
    Conda,
}

impl BackendKind {
    pub fn executable(&self) -> &'static str {
        match self {
            BackendKind::Mamba => "mamba",
            BackendKind::Micromamba => "micromamba",
            BackendKind::Conda => "conda",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Probe order, fastest tool first.
pub const PROBE_ORDER: &[BackendKind] = &[
    BackendKind::Mamba,
    BackendKind::Micromamba,
    BackendKind::Conda,
];

/// Pick the highest-priority backend the `available` predicate accepts.
pub fn select_backend(mut available: impl FnMut(BackendKind) -> bool) -> Option<BackendKind> {
    PROBE_ORDER.iter().copied().find(|kind| available(*kind))
}

/// Probe the host for installed backends, in priority order.
pub fn detect_backend() -> Option<BackendKind> {
    select_backend(|kind| executable_available(kind.executable()))
}

fn executable_available(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Drives one backend for the lifetime of a build pass.
pub struct Provisioner {
    backend: BackendKind,
}

impl Provisioner {
    /// Probe the host and cache the selected backend.
    pub fn detect() -> Result<Self, ProvisionError> {
        detect_backend()
            .map(Self::with_backend)
            .ok_or(ProvisionError::NoBackend)
    }

    /// Use a known backend without probing. Exposed for tests.
    pub fn with_backend(backend: BackendKind) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Create the environment at `prefix` and install `specs` into it.
    ///
    /// Any non-zero exit is fatal; the child's captured stderr rides along
    /// in the error.
    pub fn create_environment(
        &self,
        prefix: &EnvPrefix,
        specs: &[String],
    ) -> Result<(), ProvisionError> {
        match self.backend {
            BackendKind::Micromamba => self.create_oneshot(prefix, specs),
            BackendKind::Mamba => {
                // Mamba needs the prefix directory to exist already
                fs::create_dir_all(prefix.path())?;
                self.create_two_phase("mamba", prefix, specs)
            }
            BackendKind::Conda => self.create_two_phase("conda", prefix, specs),
        }
    }

    /// micromamba: create + install in one call, platform as a flag.
    fn create_oneshot(&self, prefix: &EnvPrefix, specs: &[String]) -> Result<(), ProvisionError> {
        let mut cmd = Command::new("micromamba");
        cmd.args(["create", "--yes", "--root-prefix"])
            .arg(prefix.root())
            .args(["--name", prefix.env_name()])
            .arg(format!("--platform={}", PLATFORM));
        add_channel_args(&mut cmd);
        cmd.args(specs);
        run_checked("micromamba", cmd)
    }

    /// mamba/conda: create an empty env, then install into it with the
    /// platform subdir pinned through a prefix-local `.condarc`.
    fn create_two_phase(
        &self,
        tool: &'static str,
        prefix: &EnvPrefix,
        specs: &[String],
    ) -> Result<(), ProvisionError> {
        let mut create = Command::new(tool);
        create.args(["create", "--yes", "--prefix"]).arg(prefix.path());
        add_channel_args(&mut create);
        run_checked(tool, create)?;

        let condarc = write_condarc(&prefix.path())?;

        let mut install = Command::new(tool);
        install
            .args(["install", "--yes", "--prefix"])
            .arg(prefix.path());
        add_channel_args(&mut install);
        install.args(specs);
        install.env("CONDARC", &condarc);
        run_checked(tool, install)
    }
}

fn add_channel_args(cmd: &mut Command) {
    for channel in CHANNELS {
        cmd.args(["-c", channel]);
    }
}

/// Write the prefix-local `.condarc` pinning the package subdir to the
/// target platform. The backends would otherwise resolve for the native
/// platform.
fn write_condarc(prefix_path: &Path) -> Result<std::path::PathBuf, std::io::Error> {
    let path = prefix_path.join(".condarc");
    fs::write(&path, format!("subdir: {}\n", PLATFORM))?;
    Ok(path)
}

fn run_checked(tool: &'static str, mut cmd: Command) -> Result<(), ProvisionError> {
    tracing::debug!(tool = tool, "invoking package manager");
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(ProvisionError::CommandFailed {
            tool,
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_picks_highest_priority() {
        assert_eq!(select_backend(|_| true), Some(BackendKind::Mamba));
        assert_eq!(
            select_backend(|kind| kind != BackendKind::Mamba),
            Some(BackendKind::Micromamba)
        );
        assert_eq!(
            select_backend(|kind| kind == BackendKind::Conda),
            Some(BackendKind::Conda)
        );
    }

    #[test]
    fn test_selection_with_nothing_available() {
        assert_eq!(select_backend(|_| false), None);
    }

    #[test]
    fn test_selection_ignores_probe_call_order() {
        // The predicate result, not the order of probing, decides
        let mut probed = Vec::new();
        let selected = select_backend(|kind| {
            probed.push(kind);
            kind == BackendKind::Conda
        });
        assert_eq!(selected, Some(BackendKind::Conda));
        assert_eq!(probed, PROBE_ORDER);
    }

    #[test]
    fn test_condarc_pins_platform_subdir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_condarc(tmp.path()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "subdir: emscripten-32\n");
    }
}
