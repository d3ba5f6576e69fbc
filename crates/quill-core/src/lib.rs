//! quill-core: Document collection store
//!
//! This library tracks which files belong to which named collection, keeps a
//! JSON ledger in step with the collection directories on disk, and handles
//! ingestion and deletion of documents.

pub mod config;
pub mod consts;
pub mod discover;
pub mod ingest;
pub mod ledger;
pub mod reconcile;
pub mod registry;
pub mod resolve;
pub mod store;

use std::path::PathBuf;

pub use config::Config;
pub use consts::*;
pub use discover::find_quill_root;
pub use ingest::{IngestReport, Rejection};
pub use ledger::{DocumentId, DocumentRecord, Ledger};
pub use reconcile::ReconcileReport;
pub use registry::CollectionRegistry;
pub use resolve::resolve_unique_path;
pub use store::{DocumentStore, SharedStore};

#[derive(Debug, thiserror::Error)]
pub enum QuillError {
    #[error("Not in a quill library (no .quill folder found)")]
    NotInLibrary,

    #[error("Already initialized: {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Failed to load ledger {}: {reason}", path.display())]
    LedgerLoadFailed { path: PathBuf, reason: String },

    #[error("Failed to persist ledger {}: {source}", path.display())]
    LedgerPersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete document {id}: {source}")]
    DeleteFailed {
        id: DocumentId,
        #[source]
        source: Box<QuillError>,
    },

    #[error("Failed to remove {}: {source}", path.display())]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QuillError>;
