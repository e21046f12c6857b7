//! Discovery and copying of federated front-end extensions.
//!
//! An extension is a directory carrying a `package.json` manifest with a
//! `name` field. Extensions are harvested from two places: the host's
//! pre-bundled extension dir, and `share/jupyter/labextensions` inside the
//! provisioned environment. Each one becomes a copy task into the output
//! tree, keyed by its declared name.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::task::Task;

/// Well-known manifest file name identifying an extension directory.
pub const EXTENSION_MANIFEST: &str = "package.json";

/// Where provisioned environments keep their bundled extensions.
pub const SHARE_LABEXTENSIONS: &str = "share/jupyter/labextensions";

/// A parsed extension manifest: the plugin's declared name plus the
/// manifest's location on disk.
#[derive(Debug, Clone)]
pub struct ExtensionManifest {
    pub name: String,
    pub path: PathBuf,
}

impl ExtensionManifest {
    /// Read and parse one manifest. A manifest without a `name` is a broken
    /// extension and fails the build.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let data: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest JSON: {}", path.display()))?;
        let name = data
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                anyhow::anyhow!("Manifest has no \"name\" field: {}", path.display())
            })?;
        Ok(Self {
            name,
            path: path.to_path_buf(),
        })
    }

    /// The extension directory the manifest sits in.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

/// Find every extension manifest under `root`, at any depth.
///
/// Order is directory-traversal order, not sorted; consumers must not
/// depend on it. A missing or non-directory root yields an empty list.
pub fn discover_extensions(root: &Path) -> Result<Vec<ExtensionManifest>> {
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }
    walk_manifests(root, &mut found)?;
    Ok(found)
}

fn walk_manifests(dir: &Path, out: &mut Vec<ExtensionManifest>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_manifests(&path, out)?;
        } else if entry.file_name() == EXTENSION_MANIFEST {
            out.push(ExtensionManifest::read(&path)?);
        }
    }
    Ok(())
}

/// Generated source-map sidecars are not real inputs of an extension.
pub fn is_sourcemap(file_name: &str) -> bool {
    file_name.ends_with(".js.map") || file_name.ends_with(".css.map")
}

/// Every non-directory file under `dir`, source maps excluded. These are
/// the file dependencies of the extension's copy task.
pub fn extension_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    Ok(files)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
            continue;
        }
        let name = entry.file_name();
        if is_sourcemap(&name.to_string_lossy()) {
            continue;
        }
        out.push(path);
    }
    Ok(())
}

/// Build the copy task for one extension: recursively copy its directory
/// into `<output_extensions>/<name>`, replacing any previous copy.
pub fn copy_extension_task(
    manifest: &ExtensionManifest,
    output_extensions: &Path,
) -> Result<Task> {
    let src = manifest.dir().to_path_buf();
    let dest = output_extensions.join(&manifest.name);
    let deps = extension_files(&src)?;
    Ok(Task::new(format!("xeus:copy:ext:{}", manifest.name))
        .deps(deps)
        .action(move || copy_overwriting(&src, &dest)))
}

/// Copy `src` over `dest`, dropping whatever was there before. Files copy
/// directly; directories copy recursively.
pub fn copy_overwriting(src: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        if dest.is_dir() {
            fs::remove_dir_all(dest)
                .with_context(|| format!("Failed to remove: {}", dest.display()))?;
        } else {
            fs::remove_file(dest)
                .with_context(|| format!("Failed to remove: {}", dest.display()))?;
        }
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create: {}", parent.display()))?;
    }
    if src.is_dir() {
        copy_dir_recursive(src, dest)
    } else {
        fs::copy(src, dest)
            .map(|_| ())
            .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create: {}", dest.display()))?;
    let entries = fs::read_dir(src)
        .with_context(|| format!("Failed to read directory: {}", src.display()))?;
    for entry in entries.flatten() {
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            fs::copy(&from, &to)
                .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_extension(root: &Path, dir: &str, name: &str) -> PathBuf {
        let ext_dir = root.join(dir);
        fs::create_dir_all(&ext_dir).unwrap();
        fs::write(
            ext_dir.join(EXTENSION_MANIFEST),
            format!("{{\"name\": \"{}\", \"jupyterlab\": {{}}}}", name),
        )
        .unwrap();
        ext_dir
    }

    #[test]
    fn test_discover_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let found = discover_extensions(tmp.path()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_missing_root() {
        let found = discover_extensions(Path::new("/nonexistent/labextensions")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_finds_manifests_at_various_depths() {
        let tmp = tempfile::tempdir().unwrap();
        write_extension(tmp.path(), "plain-ext", "plain-ext");
        write_extension(tmp.path(), "@scope/deep-ext", "@scope/deep-ext");
        write_extension(tmp.path(), "a/b/c/buried-ext", "buried-ext");

        let found = discover_extensions(tmp.path()).unwrap();
        assert_eq!(found.len(), 3);
        let mut names: Vec<_> = found.iter().map(|m| m.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["@scope/deep-ext", "buried-ext", "plain-ext"]);
    }

    #[test]
    fn test_manifest_without_name_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(EXTENSION_MANIFEST);
        fs::write(&path, "{\"version\": \"1.0.0\"}").unwrap();
        assert!(ExtensionManifest::read(&path).is_err());
    }

    #[test]
    fn test_sourcemaps_excluded_from_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ext = write_extension(tmp.path(), "ext", "ext");
        let static_dir = ext.join("static");
        fs::create_dir_all(&static_dir).unwrap();
        fs::write(static_dir.join("remoteEntry.js"), "js").unwrap();
        fs::write(static_dir.join("remoteEntry.js.map"), "map").unwrap();
        fs::write(static_dir.join("style.css.map"), "map").unwrap();

        let files = extension_files(&ext).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"remoteEntry.js".to_string()));
        assert!(names.contains(&EXTENSION_MANIFEST.to_string()));
        assert!(!names.iter().any(|n| n.ends_with(".map")));
    }

    #[test]
    fn test_copy_task_overwrites_previous_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let ext = write_extension(tmp.path(), "src/ext", "my-ext");
        fs::write(ext.join("bundle.js"), "v2").unwrap();

        let out = tmp.path().join("out");
        let dest = out.join("my-ext");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.js"), "old").unwrap();

        let manifest = ExtensionManifest::read(&ext.join(EXTENSION_MANIFEST)).unwrap();
        let task = copy_extension_task(&manifest, &out).unwrap();
        assert_eq!(task.name(), "xeus:copy:ext:my-ext");
        assert!(!task.file_deps().is_empty());

        let mut runner = crate::task::TaskRunner::new(tmp.path());
        runner.run(std::slice::from_ref(&task)).unwrap();

        assert!(dest.join("bundle.js").exists());
        assert!(dest.join(EXTENSION_MANIFEST).exists());
        assert!(!dest.join("stale.js").exists());
    }
}
