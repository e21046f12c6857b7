//! The bundle manifest: dedupe the federated-extension list after all
//! copies have landed.
//!
//! Runs as the final task of a build. Every listed extension entry is kept
//! only if its load artifact actually exists in the output tree; duplicate
//! names keep the entry applied last; the rewritten list is sorted by name.
//! The whole operation is idempotent.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The bundle manifest file at the root of the output tree.
pub const JUPYTERLITE_JSON: &str = "jupyter-lite.json";

/// Config section the extension list normally nests under.
pub const JUPYTER_CONFIG_DATA: &str = "jupyter-config-data";

/// Key holding the extension entries.
pub const FEDERATED_EXTENSIONS: &str = "federated_extensions";

/// One extension entry: name, entry-point path relative to the extension's
/// output directory, plus whatever other keys the upstream tooling wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedExtension {
    pub name: String,
    pub load: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Rewrite the manifest at `manifest_path` so every extension name appears
/// exactly once, pointing at an artifact present under `output_extensions`.
pub fn patch_bundle_manifest(manifest_path: &Path, output_extensions: &Path) -> Result<()> {
    let content = fs::read_to_string(manifest_path)
        .with_context(|| format!("Failed to read bundle manifest: {}", manifest_path.display()))?;
    let mut doc: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse bundle manifest: {}", manifest_path.display()))?;

    let changed = {
        let root = doc
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("Bundle manifest is not a JSON object"))?;
        if matches!(root.get(JUPYTER_CONFIG_DATA), Some(Value::Object(_))) {
            match root.get_mut(JUPYTER_CONFIG_DATA) {
                Some(Value::Object(config)) => dedupe_entries(config, output_extensions)?,
                _ => false,
            }
        } else {
            dedupe_entries(root, output_extensions)?
        }
    };

    if !changed {
        return Ok(());
    }
    let serialized = serde_json::to_string_pretty(&doc)?;
    fs::write(manifest_path, serialized)
        .with_context(|| format!("Failed to write bundle manifest: {}", manifest_path.display()))
}

/// Dedupe the list in place. Returns false when the key is absent and there
/// is nothing to do.
fn dedupe_entries(
    config: &mut serde_json::Map<String, Value>,
    output_extensions: &Path,
) -> Result<bool> {
    let Some(list) = config.get(FEDERATED_EXTENSIONS) else {
        return Ok(false);
    };
    let entries: Vec<FederatedExtension> = serde_json::from_value(list.clone())
        .context("Malformed federated_extensions list")?;

    // Later entries with the same name overwrite earlier ones; entries
    // whose artifact is missing are dropped. BTreeMap gives the sorted
    // rewrite for free.
    let mut named: BTreeMap<String, FederatedExtension> = BTreeMap::new();
    for ext in entries {
        if output_extensions.join(&ext.name).join(&ext.load).exists() {
            named.insert(ext.name.clone(), ext);
        } else {
            tracing::warn!(
                name = %ext.name,
                load = %ext.load,
                "dropping federated extension entry: artifact missing from output"
            );
        }
    }

    let deduped: Vec<FederatedExtension> = named.into_values().collect();
    config.insert(FEDERATED_EXTENSIONS.to_string(), serde_json::to_value(deduped)?);
    Ok(true)
}
