//! Ingestion: copy source files into a collection and mint records for them

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{CollectionRegistry, Config, DocumentRecord, Result, resolve_unique_path};

/// Progress events emitted during ingestion.
#[derive(Debug, Clone)]
pub enum ProgressEvent<'a> {
    /// About to process a source file.
    Copying {
        current: usize,
        total: usize,
        path: &'a Path,
    },
}

/// Type alias for progress callback.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send>;

/// Why a source file was skipped without being copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedExtension,
    /// File name is not valid UTF-8 and cannot be recorded
    InvalidName,
    /// File name starts with `.`; reconciliation never adopts these
    Hidden,
    NotAFile,
    TooLarge { size: u64, limit: u64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnsupportedExtension => f.write_str("unsupported file type"),
            Rejection::InvalidName => f.write_str("file name is not valid UTF-8"),
            Rejection::Hidden => f.write_str("hidden file"),
            Rejection::NotAFile => f.write_str("not a regular file"),
            Rejection::TooLarge { size, limit } => {
                write!(f, "too large ({} bytes, limit {} bytes)", size, limit)
            }
        }
    }
}

/// An I/O failure while copying one source file.
#[derive(Debug, thiserror::Error)]
#[error("Failed to copy to {}: {source}", target.display())]
pub struct CopyFailed {
    pub target: PathBuf,
    pub source: io::Error,
}

/// Per-file outcome of an ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Records created, in source order
    pub added: Vec<DocumentRecord>,
    pub rejected: Vec<(PathBuf, Rejection)>,
    pub failed: Vec<(PathBuf, CopyFailed)>,
}

/// Copy each of `sources` into `collection`, returning a record for every
/// file stored.
///
/// Fails only if `collection` is not registered. Rejected and failed files are
/// reported in the [`IngestReport`] and do not stop the batch. Nothing is
/// persisted here.
pub fn ingest_batch(
    sources: &[PathBuf],
    collection: &str,
    registry: &CollectionRegistry,
    config: &Config,
    on_progress: &dyn Fn(ProgressEvent),
) -> Result<IngestReport> {
    let dir = registry.directory_for(collection)?;
    let mut report = IngestReport::default();

    for (i, source) in sources.iter().enumerate() {
        on_progress(ProgressEvent::Copying {
            current: i + 1,
            total: sources.len(),
            path: source,
        });

        let file_name = match check_source(source, config) {
            Ok(name) => name,
            Err(rejection) => {
                tracing::debug!("Rejected {}: {}", source.display(), rejection);
                report.rejected.push((source.clone(), rejection));
                continue;
            }
        };

        let target = resolve_unique_path(&dir.join(file_name));
        if let Err(source_err) = copy_document(source, &target) {
            let failure = CopyFailed {
                target,
                source: source_err,
            };
            tracing::warn!("Failed to ingest {}: {}", source.display(), failure);
            report.failed.push((source.clone(), failure));
            continue;
        }

        match DocumentRecord::for_file(target.clone(), collection) {
            Some(record) => {
                tracing::debug!("Ingested {} as {}", source.display(), record.name);
                report.added.push(record);
            }
            None => {
                let _ = fs::remove_file(&target);
                report.rejected.push((source.clone(), Rejection::InvalidName));
            }
        }
    }

    tracing::info!(
        "Ingested {} of {} files into {}",
        report.added.len(),
        sources.len(),
        collection
    );

    Ok(report)
}

/// Validate a source file and return its base name.
fn check_source<'a>(
    source: &'a Path,
    config: &Config,
) -> std::result::Result<&'a str, Rejection> {
    if !config.is_supported(source) {
        return Err(Rejection::UnsupportedExtension);
    }

    let name = source.file_name().ok_or(Rejection::NotAFile)?;
    let name = name.to_str().ok_or(Rejection::InvalidName)?;
    if name.starts_with('.') {
        return Err(Rejection::Hidden);
    }

    let metadata = fs::metadata(source).map_err(|_| Rejection::NotAFile)?;
    if !metadata.is_file() {
        return Err(Rejection::NotAFile);
    }

    if metadata.len() > config.max_document_size {
        return Err(Rejection::TooLarge {
            size: metadata.len(),
            limit: config.max_document_size,
        });
    }

    Ok(name)
}

/// Copy bytes and permissions, then carry over the modification time.
fn copy_document(source: &Path, target: &Path) -> io::Result<()> {
    if let Err(e) = fs::copy(source, target) {
        // target was free before the copy, so anything there is a partial write
        let _ = fs::remove_file(target);
        return Err(e);
    }

    let mtime = fs::metadata(source).and_then(|m| m.modified());
    let applied = mtime.and_then(|t| {
        fs::File::options()
            .write(true)
            .open(target)
            .and_then(|f| f.set_modified(t))
    });
    if let Err(e) = applied {
        tracing::debug!("Could not preserve mtime on {}: {}", target.display(), e);
    }

    Ok(())
}
