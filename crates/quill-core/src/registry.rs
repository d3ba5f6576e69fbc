//! Collection registry: named collections, each backed by one directory

use std::path::{Path, PathBuf};

use crate::{QuillError, Result};

/// The set of collections known to a library, in display order.
#[derive(Debug, Clone)]
pub struct CollectionRegistry {
    root: PathBuf,
    names: Vec<String>,
}

impl CollectionRegistry {
    /// Build a registry rooted at `root`.
    ///
    /// Names must be usable as a single directory component and must not
    /// repeat. Nothing is created on disk; see [`ensure_dirs`](Self::ensure_dirs).
    pub fn new(root: impl Into<PathBuf>, names: &[String]) -> Result<Self> {
        let mut validated: Vec<String> = Vec::with_capacity(names.len());

        for name in names {
            if !is_valid_name(name) || validated.contains(name) {
                return Err(QuillError::InvalidCollection(name.clone()));
            }
            validated.push(name.clone());
        }

        Ok(Self {
            root: root.into(),
            names: validated,
        })
    }

    /// Create every collection directory that does not exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        for name in &self.names {
            std::fs::create_dir_all(self.root.join(name))?;
        }
        Ok(())
    }

    /// Collection names in configuration order.
    pub fn list(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Directory backing the named collection.
    pub fn directory_for(&self, name: &str) -> Result<PathBuf> {
        if self.contains(name) {
            Ok(self.root.join(name))
        } else {
            Err(QuillError::UnknownCollection(name.to_string()))
        }
    }

    /// Whether `path` sits directly inside the directory of `collection`.
    pub fn owns(&self, collection: &str, path: &Path) -> bool {
        match self.directory_for(collection) {
            Ok(dir) => path.parent() == Some(dir.as_path()),
            Err(_) => false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}
