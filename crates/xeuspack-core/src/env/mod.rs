//! Provisioning of the emscripten-32 kernel environment.
//!
//! `spec` holds the fixed install specs and channel list, `prefix` owns the
//! on-disk environment prefix for one build pass, and `backend` selects and
//! drives whichever conda-family package manager is installed on the host.

pub mod backend;
pub mod prefix;
pub mod spec;

pub use backend::{BackendKind, ProvisionError, Provisioner};
pub use prefix::EnvPrefix;
pub use spec::{install_specs, CHANNELS, PLATFORM};
