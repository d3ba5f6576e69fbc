//! Document ledger: the JSON file listing every document record
//!
//! The ledger is always rewritten as a whole. Writes go to a temporary file in
//! the ledger's directory which is then renamed over the target, so a crash
//! mid-write leaves the previous ledger intact.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::{QuillError, Result};

/// Opaque document identifier. Minted once, never derived from content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Mint a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A single document tracked by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique id
    pub id: DocumentId,
    /// File name as stored on disk
    pub name: String,
    /// Absolute path of the stored file
    pub path: PathBuf,
    /// Owning collection
    pub collection: String,
}

impl DocumentRecord {
    /// Create a record with a freshly minted id for a file at `path`.
    ///
    /// Returns `None` if `path` has no file name or is not valid UTF-8, since
    /// such a path cannot be written to the ledger.
    pub fn for_file(path: PathBuf, collection: &str) -> Option<Self> {
        path.to_str()?;
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            id: DocumentId::generate(),
            name,
            path,
            collection: collection.to_string(),
        })
    }

    fn is_well_formed(&self) -> bool {
        !self.id.as_str().is_empty()
            && !self.name.is_empty()
            && !self.collection.is_empty()
            && self.path.is_absolute()
    }
}

/// Result of reading the ledger file.
#[derive(Debug, Default)]
pub struct LoadedLedger {
    pub records: Vec<DocumentRecord>,
    /// Entries that did not have the shape of a record
    pub skipped: usize,
}

/// Handle on the ledger file.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger.
    ///
    /// A missing file is an empty ledger. A file that cannot be read or is not
    /// a JSON array fails with [`QuillError::LedgerLoadFailed`]. Individual
    /// entries that are not well-formed records are skipped.
    pub fn load(&self) -> Result<LoadedLedger> {
        if !self.path.exists() {
            return Ok(LoadedLedger::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.load_failed(e))?;
        let entries: Vec<Value> = serde_json::from_str(&content).map_err(|e| self.load_failed(e))?;

        let mut loaded = LoadedLedger::default();
        for (i, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<DocumentRecord>(entry) {
                Ok(record) if record.is_well_formed() => loaded.records.push(record),
                Ok(_) => {
                    tracing::warn!("Skipping malformed ledger entry {}", i);
                    loaded.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed ledger entry {}: {}", i, e);
                    loaded.skipped += 1;
                }
            }
        }

        Ok(loaded)
    }

    /// Read the ledger, falling back to an empty one if it cannot be loaded.
    pub fn load_or_empty(&self) -> Vec<DocumentRecord> {
        match self.load() {
            Ok(loaded) => loaded.records,
            Err(e) => {
                tracing::warn!("{}; starting from an empty ledger", e);
                Vec::new()
            }
        }
    }

    /// Replace the ledger contents with `records`.
    pub fn persist(&self, records: &[DocumentRecord]) -> Result<()> {
        self.write_atomic(records)
            .map_err(|source| QuillError::LedgerPersistFailed {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!("Persisted {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn write_atomic(&self, records: &[DocumentRecord]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, records)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    fn load_failed(&self, reason: impl fmt::Display) -> QuillError {
        QuillError::LedgerLoadFailed {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
