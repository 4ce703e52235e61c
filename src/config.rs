use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 40;

/// One JSON endpoint contributing records to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub key: String,
    /// http(s) URL, or a filesystem path resolved relative to the config file.
    pub location: String,
    /// Human-readable label for loading-state text and section headings.
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub sources: Vec<SourceDescriptor>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl CatalogConfig {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Catalog")
    }

    pub fn source(&self, key: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|source| source.key == key)
    }
}

/// Loads and validates a catalog config. Returns the config together with
/// the directory relative paths resolve against.
pub fn load(path: &Path) -> anyhow::Result<(CatalogConfig, PathBuf)> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("read catalog config: {}", path.display()))?;
    let config: CatalogConfig = serde_yaml::from_str(&yaml)
        .with_context(|| format!("parse catalog config: {}", path.display()))?;

    if config.sources.is_empty() {
        anyhow::bail!("catalog config has no sources: {}", path.display());
    }
    if config.batch_size == 0 {
        anyhow::bail!("batch_size must be >= 1: {}", path.display());
    }

    let mut seen = HashSet::new();
    for source in &config.sources {
        if source.key.trim().is_empty() {
            anyhow::bail!("source key must be non-empty: {}", path.display());
        }
        if !seen.insert(source.key.as_str()) {
            anyhow::bail!("duplicate source key: {}", source.key);
        }
    }

    let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    Ok((config, base_dir))
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_BATCH_SIZE;

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let path = temp.path().join("sources.yaml");
        std::fs::write(&path, contents).expect("write config");
        (temp, path)
    }

    #[test]
    fn defaults_applied() {
        let (_temp, path) = write_config(
            "sources:\n  - key: a\n    location: a.json\n    label: A\n",
        );
        let (config, base_dir) = super::load(&path).expect("load config");
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.title(), "Catalog");
        assert_eq!(base_dir, path.parent().unwrap());
    }

    #[test]
    fn duplicate_keys_rejected() {
        let (_temp, path) = write_config(
            "sources:\n  - key: a\n    location: a.json\n    label: A\n  - key: a\n    location: b.json\n    label: B\n",
        );
        let err = super::load(&path).unwrap_err().to_string();
        assert!(err.contains("duplicate source key"));
    }

    #[test]
    fn empty_sources_rejected() {
        let (_temp, path) = write_config("sources: []\n");
        let err = super::load(&path).unwrap_err().to_string();
        assert!(err.contains("no sources"));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let (_temp, path) = write_config(
            "batch_size: 0\nsources:\n  - key: a\n    location: a.json\n    label: A\n",
        );
        let err = super::load(&path).unwrap_err().to_string();
        assert!(err.contains("batch_size"));
    }
}
