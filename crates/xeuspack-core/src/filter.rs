//! Loading of the empack file-filter ruleset.
//!
//! The ruleset decides which files of the provisioned environment end up in
//! the packed runtime artifact. It is resolved once per build, either from a
//! remote YAML document or a local file, and is immutable after load. No
//! caching, no retry: an unreachable or unparsable document aborts the build.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// Well-known recipe ruleset used when the consumer does not supply one.
pub const DEFAULT_FILTER_CONFIG: &str =
    "https://raw.githubusercontent.com/emscripten-forge/recipes/main/empack_config.yaml";

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to fetch filter config from {url}: {source}")]
    Fetch {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to read filter config {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse filter config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// One glob-style pattern entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterPattern {
    pub pattern: String,
}

/// Include/exclude patterns for one package (or the default section).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterPatterns {
    #[serde(default)]
    pub include_patterns: Vec<FilterPattern>,
    #[serde(default)]
    pub exclude_patterns: Vec<FilterPattern>,
}

/// The parsed rule sections of the document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterRules {
    #[serde(default)]
    pub packages: BTreeMap<String, FilterPatterns>,
    #[serde(rename = "default", default)]
    pub default_rules: Option<FilterPatterns>,
}

/// A loaded filter ruleset.
///
/// The original document text is kept verbatim so it can be materialized
/// unmodified for the external packer; the parsed view exists for
/// validation and inspection.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    text: String,
    rules: FilterRules,
}

impl PackageFilter {
    /// Resolve `source` as an HTTP(S) URL or a local file path, fetch or
    /// read it, and parse the YAML ruleset.
    pub fn load(source: &str) -> Result<Self, FilterError> {
        let text = if is_url(source) {
            fetch(source)?
        } else {
            fs::read_to_string(source).map_err(|e| FilterError::Read {
                path: source.into(),
                source: e,
            })?
        };
        let rules: FilterRules = serde_yaml::from_str(&text)?;
        Ok(Self { text, rules })
    }

    pub fn rules(&self) -> &FilterRules {
        &self.rules
    }

    /// Number of packages with dedicated rules, for diagnostics.
    pub fn package_rule_count(&self) -> usize {
        self.rules.packages.len()
    }

    /// Write the document verbatim so the packer reads exactly what was
    /// resolved, not a re-serialization.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.text)
            .with_context(|| format!("Failed to write filter config: {}", path.display()))
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn fetch(url: &str) -> Result<String, FilterError> {
    tracing::debug!(url = url, "fetching filter config");
    let response = ureq::get(url).call().map_err(|e| FilterError::Fetch {
        url: url.to_string(),
        source: Box::new(e),
    })?;
    response.into_string().map_err(|e| FilterError::Fetch {
        url: url.to_string(),
        source: Box::new(e),
    })
}
