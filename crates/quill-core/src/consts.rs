/// The name of the quill metadata folder inside a library root
pub const QUILL_DIR: &str = ".quill";

/// Config file name inside the quill folder
pub const CONFIG_FILE: &str = "config.json";

/// Ledger file name inside the quill folder
pub const LEDGER_FILE: &str = "ledger.json";

/// Collections created for a fresh library
pub const DEFAULT_COLLECTIONS: &[&str] = &[
    "Work Documents",
    "Research Papers",
    "Personal Files",
    "Study Materials",
];

/// Document types accepted by default
pub const DEFAULT_EXTENSIONS: &[&str] = &["pdf", "txt", "docx"];

/// Default max document size (5MB)
pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = 5 * 1024 * 1024;
