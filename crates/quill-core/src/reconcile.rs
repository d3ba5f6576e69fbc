//! Reconciliation: merge ledger records with the collection directories on disk

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::{CollectionRegistry, Config, DocumentId, DocumentRecord};

/// What a reconciliation pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Ledger records that survived
    pub kept: usize,
    /// Ledger records dropped as stale or invalid
    pub dropped: usize,
    /// Files found on disk with no record, given a new one
    pub adopted: usize,
}

/// Merge `records` with what is actually present in each collection directory.
///
/// Records survive only if their collection is registered, their path lies
/// directly inside that collection's directory and is valid UTF-8, the file
/// still exists and has a supported extension, and neither its id nor its
/// path was already claimed by an earlier record. Supported files on disk with no surviving record are
/// adopted under a new id. Scan failures never abort the pass.
pub fn reconcile(
    records: Vec<DocumentRecord>,
    registry: &CollectionRegistry,
    config: &Config,
) -> (Vec<DocumentRecord>, ReconcileReport) {
    let mut report = ReconcileReport::default();
    let mut ids = HashSet::new();
    let mut paths: HashSet<PathBuf> = HashSet::new();
    let mut merged = Vec::with_capacity(records.len());

    for record in records {
        match rejection_reason(&record, registry, config, &ids, &paths) {
            Some(reason) => {
                tracing::warn!(
                    "Dropping ledger record {} ({}): {}",
                    record.id,
                    record.path.display(),
                    reason
                );
                report.dropped += 1;
            }
            None => {
                ids.insert(record.id.clone());
                paths.insert(record.path.clone());
                merged.push(record);
                report.kept += 1;
            }
        }
    }

    for collection in registry.list() {
        let Ok(dir) = registry.directory_for(collection) else {
            continue;
        };

        for path in scan_collection(&dir) {
            if paths.contains(&path) || !config.is_supported(&path) {
                continue;
            }

            let Some(record) = DocumentRecord::for_file(path.clone(), collection) else {
                tracing::warn!("Not adopting {}: name is not valid UTF-8", path.display());
                continue;
            };
            tracing::debug!("Adopting {} into {}", path.display(), collection);
            paths.insert(path);
            merged.push(record);
            report.adopted += 1;
        }
    }

    tracing::info!(
        "Reconciled ledger: {} kept, {} dropped, {} adopted",
        report.kept,
        report.dropped,
        report.adopted
    );

    (merged, report)
}

fn rejection_reason(
    record: &DocumentRecord,
    registry: &CollectionRegistry,
    config: &Config,
    ids: &HashSet<DocumentId>,
    paths: &HashSet<PathBuf>,
) -> Option<&'static str> {
    if !registry.contains(&record.collection) {
        Some("unknown collection")
    } else if !registry.owns(&record.collection, &record.path) {
        Some("path outside its collection")
    } else if record.path.to_str().is_none() {
        Some("path is not valid UTF-8")
    } else if !record.path.is_file() {
        Some("file no longer exists")
    } else if !config.is_supported(&record.path) {
        Some("unsupported file type")
    } else if ids.contains(&record.id) {
        Some("duplicate id")
    } else if paths.contains(&record.path) {
        Some("duplicate path")
    } else {
        None
    }
}

/// List regular files directly inside `dir`, sorted by name.
///
/// Hidden files are skipped. Errors are logged and treated as no files.
pub fn scan_collection(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.depth() == 1 && entry.file_type().is_some_and(|t| t.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("Failed to scan {}: {}", dir.display(), e);
            }
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(collections: &[&str]) -> (tempfile::TempDir, CollectionRegistry) {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let names: Vec<String> = collections.iter().map(|c| c.to_string()).collect();
        let registry = CollectionRegistry::new(root, &names).unwrap();
        registry.ensure_dirs().unwrap();
        (temp, registry)
    }

    fn put(registry: &CollectionRegistry, collection: &str, name: &str) -> PathBuf {
        let path = registry.directory_for(collection).unwrap().join(name);
        fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn test_adopts_untracked_file() {
        let (_temp, registry) = setup(&["Work Documents"]);
        let path = put(&registry, "Work Documents", "report.txt");

        let (records, report) = reconcile(Vec::new(), &registry, &Config::default());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "report.txt");
        assert_eq!(records[0].path, path);
        assert_eq!(records[0].collection, "Work Documents");
        assert_eq!(report.adopted, 1);
    }

    #[test]
    fn test_idempotent() {
        let (_temp, registry) = setup(&["Work Documents", "Research Papers"]);
        put(&registry, "Work Documents", "report.txt");
        put(&registry, "Research Papers", "paper.pdf");

        let (first, _) = reconcile(Vec::new(), &registry, &Config::default());
        let (second, report) = reconcile(first.clone(), &registry, &Config::default());

        assert_eq!(first, second);
        assert_eq!(report.adopted, 0);
        assert_eq!(report.kept, 2);
    }

    #[test]
    fn test_drops_stale_records() {
        let (_temp, registry) = setup(&["Work Documents"]);
        let path = put(&registry, "Work Documents", "gone.txt");

        let (records, _) = reconcile(Vec::new(), &registry, &Config::default());
        fs::remove_file(&path).unwrap();

        let (records, report) = reconcile(records, &registry, &Config::default());
        assert!(records.is_empty());
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_drops_invalid_records() {
        let (_temp, registry) = setup(&["A", "B"]);
        let a = put(&registry, "A", "one.txt");
        let exe = put(&registry, "A", "tool.exe");

        let make = |id: &str, path: &Path, collection: &str| DocumentRecord {
            id: DocumentId::from(id),
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            path: path.to_path_buf(),
            collection: collection.to_string(),
        };

        let records = vec![
            make("1", &a, "A"),
            make("2", &a, "B"),
            make("3", &a, "Z"),
            make("1", &a, "A"),
            make("4", &a, "A"),
            make("5", &exe, "A"),
        ];

        let (merged, report) = reconcile(records, &registry, &Config::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id.as_str(), "1");
        assert_eq!(report.kept, 1);
        assert_eq!(report.dropped, 5);
        assert_eq!(report.adopted, 0);
    }

    #[test]
    fn test_skips_unsupported_hidden_and_nested() {
        let (_temp, registry) = setup(&["A"]);
        put(&registry, "A", "setup.exe");
        put(&registry, "A", ".hidden.txt");
        let nested = registry.directory_for("A").unwrap().join("sub");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("deep.txt"), "x").unwrap();
        put(&registry, "A", "Notes.TXT");

        let (records, _) = reconcile(Vec::new(), &registry, &Config::default());
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Notes.TXT"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_neither_adopted_nor_kept() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (_temp, registry) = setup(&["A"]);
        let dir = registry.directory_for("A").unwrap();
        let bad = dir.join(OsStr::from_bytes(b"bad\xff.txt"));
        fs::write(&bad, "x").unwrap();
        put(&registry, "A", "good.txt");

        let (records, report) = reconcile(Vec::new(), &registry, &Config::default());
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["good.txt"]);
        assert_eq!(report.adopted, 1);

        let stray = DocumentRecord {
            id: DocumentId::from("stray"),
            name: "bad.txt".to_string(),
            path: bad,
            collection: "A".to_string(),
        };
        let (records, report) = reconcile(vec![stray], &registry, &Config::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "good.txt");
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let (_temp, registry) = setup(&["A"]);
        fs::remove_dir(registry.directory_for("A").unwrap()).unwrap();

        let (records, report) = reconcile(Vec::new(), &registry, &Config::default());
        assert!(records.is_empty());
        assert_eq!(report, ReconcileReport::default());
    }

    #[test]
    fn test_scan_is_sorted() {
        let (_temp, registry) = setup(&["A"]);
        for name in ["c.txt", "a.txt", "b.txt"] {
            put(&registry, "A", name);
        }

        let dir = registry.directory_for("A").unwrap();
        let names: Vec<_> = scan_collection(&dir)
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }
}
