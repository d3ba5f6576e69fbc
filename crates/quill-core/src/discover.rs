//! Library layout: locating the root and the files under `.quill`

use std::path::{Path, PathBuf};

use crate::{CONFIG_FILE, LEDGER_FILE, QUILL_DIR, QuillError, Result};

/// Nearest ancestor of `start` (inclusive) that holds a `.quill` directory.
pub fn find_quill_root(start: &Path) -> Result<PathBuf> {
    let start = start.canonicalize()?;
    start
        .ancestors()
        .find(|dir| quill_dir(dir).is_dir())
        .map(Path::to_path_buf)
        .ok_or(QuillError::NotInLibrary)
}

pub fn quill_dir(root: &Path) -> PathBuf {
    root.join(QUILL_DIR)
}

/// `<root>/.quill/config.json`
pub fn config_path(root: &Path) -> PathBuf {
    quill_dir(root).join(CONFIG_FILE)
}

/// `<root>/.quill/ledger.json`
pub fn ledger_path(root: &Path) -> PathBuf {
    quill_dir(root).join(LEDGER_FILE)
}
