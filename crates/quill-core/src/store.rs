//! The document store: owns the in-memory records and the ledger file
//!
//! Every mutation goes through [`DocumentStore`] and rewrites the whole
//! ledger before returning. [`SharedStore`] puts a single writer lock in front
//! of it for embeddings with more than one client.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ingest::{self, ProgressCallback};
use crate::reconcile::reconcile;
use crate::{
    CollectionRegistry, Config, DocumentId, DocumentRecord, IngestReport, Ledger, QuillError,
    ReconcileReport, Result, discover,
};

/// A library of document collections rooted at one directory.
pub struct DocumentStore {
    root: PathBuf,
    config: Config,
    registry: CollectionRegistry,
    ledger: Ledger,
    records: Vec<DocumentRecord>,
    startup: ReconcileReport,
    progress_callback: Option<ProgressCallback>,
}

impl DocumentStore {
    /// Create a new library at `root` and open it.
    pub fn init(root: &Path, config: Config) -> Result<Self> {
        let quill_dir = discover::quill_dir(root);
        if quill_dir.exists() {
            return Err(QuillError::AlreadyInitialized(quill_dir));
        }

        // validate names before anything touches the disk
        CollectionRegistry::new(root, &config.collections)?;

        fs::create_dir_all(&quill_dir)?;
        config.save(root)?;
        Self::open_with_config(root, config)
    }

    /// Open the library at `root` using its saved config.
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        Self::open_with_config(root, config)
    }

    /// Open the library at `root` with an explicit config.
    ///
    /// Creates missing collection directories and runs startup reconciliation.
    /// A ledger that cannot be persisted at this point is logged, not fatal.
    pub fn open_with_config(root: &Path, config: Config) -> Result<Self> {
        fs::create_dir_all(root)?;
        let root = root.canonicalize()?;

        let registry = CollectionRegistry::new(&root, &config.collections)?;
        registry.ensure_dirs()?;
        let ledger = Ledger::new(discover::ledger_path(&root));

        let mut store = Self {
            root,
            config,
            registry,
            ledger,
            records: Vec::new(),
            startup: ReconcileReport::default(),
            progress_callback: None,
        };

        match store.reconcile_on_startup() {
            Ok(report) => store.startup = report,
            Err(e) => tracing::warn!("{}", e),
        }

        Ok(store)
    }

    /// Set a callback to receive progress updates during ingestion.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }

    /// Rebuild the in-memory state from the ledger and the collection
    /// directories, then persist the result.
    ///
    /// The in-memory state is replaced even if persisting fails.
    pub fn reconcile_on_startup(&mut self) -> Result<ReconcileReport> {
        let loaded = self.ledger.load_or_empty();
        let (merged, report) = reconcile(loaded, &self.registry, &self.config);
        self.records = merged;
        self.ledger.persist(&self.records)?;
        Ok(report)
    }

    /// Copy `sources` into `collection` and record them.
    ///
    /// The ledger is persisted once after the batch. If that fails the new
    /// records stay in memory and the copied files are adopted by the next
    /// reconciliation.
    pub fn ingest(&mut self, sources: &[PathBuf], collection: &str) -> Result<IngestReport> {
        let callback = &self.progress_callback;
        let report = ingest::ingest_batch(
            sources,
            collection,
            &self.registry,
            &self.config,
            &|event| {
                if let Some(cb) = callback {
                    cb(event);
                }
            },
        )?;

        self.records.extend(report.added.iter().cloned());
        self.ledger.persist(&self.records)?;

        Ok(report)
    }

    /// Delete a document and its file.
    ///
    /// A file that is already gone is not an error. Any other failure to
    /// remove the file leaves the record in place and returns
    /// [`QuillError::RemoveFailed`]. A failure to persist afterwards returns
    /// [`QuillError::DeleteFailed`].
    pub fn delete(&mut self, id: &DocumentId) -> Result<DocumentRecord> {
        let index = self
            .records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| QuillError::NotFound(id.clone()))?;

        let path = &self.records[index].path;
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} was already removed", path.display());
            }
            Err(source) => {
                return Err(QuillError::RemoveFailed {
                    path: path.clone(),
                    source,
                });
            }
        }

        let record = self.records.remove(index);
        self.ledger
            .persist(&self.records)
            .map_err(|e| QuillError::DeleteFailed {
                id: record.id.clone(),
                source: Box::new(e),
            })?;

        tracing::info!("Deleted {} from {}", record.name, record.collection);
        Ok(record)
    }

    /// Records in `collection`, sorted by name ignoring case.
    pub fn list_by_collection(&self, collection: &str) -> Result<Vec<DocumentRecord>> {
        if !self.registry.contains(collection) {
            return Err(QuillError::UnknownCollection(collection.to_string()));
        }

        let mut records: Vec<DocumentRecord> = self
            .records
            .iter()
            .filter(|r| r.collection == collection)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(records)
    }

    /// What reconciliation did when the store was opened.
    pub fn startup_report(&self) -> ReconcileReport {
        self.startup
    }

    pub fn get(&self, id: &DocumentId) -> Option<&DocumentRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// All records, in ledger order.
    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn collections(&self) -> &[String] {
        self.registry.list()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> &Path {
        self.ledger.path()
    }
}

/// A [`DocumentStore`] behind a single writer lock.
///
/// Every operation holds the lock for its full duration, so two clients can
/// never interleave whole-ledger rewrites.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<DocumentStore>>,
}

impl SharedStore {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    // State is re-derivable from disk, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, DocumentStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ingest(&self, sources: &[PathBuf], collection: &str) -> Result<IngestReport> {
        self.lock().ingest(sources, collection)
    }

    pub fn delete(&self, id: &DocumentId) -> Result<DocumentRecord> {
        self.lock().delete(id)
    }

    pub fn list_by_collection(&self, collection: &str) -> Result<Vec<DocumentRecord>> {
        self.lock().list_by_collection(collection)
    }

    pub fn reconcile_on_startup(&self) -> Result<ReconcileReport> {
        self.lock().reconcile_on_startup()
    }

    /// Run `f` with read access to the store.
    pub fn read<R>(&self, f: impl FnOnce(&DocumentStore) -> R) -> R {
        f(&*self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(names: &[&str]) -> (tempfile::TempDir, DocumentStore) {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            collections: names.iter().map(|n| n.to_string()).collect(),
            ..Config::default()
        };
        let store = DocumentStore::open_with_config(temp.path(), config).unwrap();
        (temp, store)
    }

    #[test]
    fn test_open_creates_layout() {
        let (_temp, store) = open(&["Work Documents", "Study Materials"]);

        assert!(store.root().join("Work Documents").is_dir());
        assert!(store.root().join("Study Materials").is_dir());
        assert!(store.ledger_path().exists());
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_list_sorted_case_insensitive() {
        let (_temp, mut store) = open(&["Work"]);
        let dir = store.root().join("Work");
        for name in ["beta.txt", "Alpha.txt", "gamma.pdf", "alpha.docx"] {
            fs::write(dir.join(name), name).unwrap();
        }
        store.reconcile_on_startup().unwrap();

        let names: Vec<_> = store
            .list_by_collection("Work")
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alpha.docx", "Alpha.txt", "beta.txt", "gamma.pdf"]);
    }

    #[test]
    fn test_list_unknown_collection() {
        let (_temp, store) = open(&["Work"]);
        assert!(matches!(
            store.list_by_collection("Nope"),
            Err(QuillError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_init_twice_fails() {
        let temp = tempfile::tempdir().unwrap();
        DocumentStore::init(temp.path(), Config::default()).unwrap();

        let again = DocumentStore::init(temp.path(), Config::default());
        assert!(matches!(again, Err(QuillError::AlreadyInitialized(_))));
    }

    #[test]
    fn test_init_rejects_bad_collection_without_side_effects() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            collections: vec!["a/b".to_string()],
            ..Config::default()
        };

        let result = DocumentStore::init(temp.path(), config);
        assert!(matches!(result, Err(QuillError::InvalidCollection(_))));
        assert!(!discover::quill_dir(temp.path()).exists());
    }

    #[test]
    fn test_open_uses_saved_config() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            collections: vec!["Inbox".to_string()],
            ..Config::default()
        };
        DocumentStore::init(temp.path(), config).unwrap();

        let store = DocumentStore::open(temp.path()).unwrap();
        assert_eq!(store.collections(), &["Inbox".to_string()]);
    }

    #[test]
    fn test_progress_callback_is_called() {
        let (temp, mut store) = open(&["Work"]);
        let src = temp.path().join("in.txt");
        fs::write(&src, "x").unwrap();

        let calls = Arc::new(Mutex::new(0usize));
        store.set_progress_callback(Box::new({
            let calls = Arc::clone(&calls);
            move |_event| *calls.lock().unwrap() += 1
        }));
        store.ingest(&[src], "Work").unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
