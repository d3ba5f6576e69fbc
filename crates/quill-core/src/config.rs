//! Configuration handling for .quill/config.json

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_COLLECTIONS, DEFAULT_EXTENSIONS, DEFAULT_MAX_DOCUMENT_SIZE, Result, discover,
};

/// Configuration stored in .quill/config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Collection names, in display order. Each maps to `<root>/<name>`.
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// File extensions accepted by ingestion and reconciliation
    #[serde(default = "default_extensions")]
    pub supported_extensions: Vec<String>,

    /// Maximum size of an ingested document (bytes)
    #[serde(default = "default_max_document_size")]
    pub max_document_size: u64,
}

fn default_collections() -> Vec<String> {
    DEFAULT_COLLECTIONS.iter().map(|c| c.to_string()).collect()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_max_document_size() -> u64 {
    DEFAULT_MAX_DOCUMENT_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collections: default_collections(),
            supported_extensions: default_extensions(),
            max_document_size: default_max_document_size(),
        }
    }
}

impl Config {
    /// Load config from the .quill directory.
    pub fn load(root: &Path) -> Result<Self> {
        let path = discover::config_path(root);
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the .quill directory.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = discover::config_path(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Whether `path` has one of the supported extensions (case-insensitive).
    pub fn is_supported(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        self.supported_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}
