//! Collision-free target paths for incoming files

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Return a path that no existing file occupies.
///
/// `candidate` is returned unchanged if nothing exists there. Otherwise the
/// first free `"<stem> (<n>)<ext>"` in the same directory is returned, counting
/// from 1. The path is not created.
pub fn resolve_unique_path(candidate: &Path) -> PathBuf {
    if !occupied(candidate) {
        return candidate.to_path_buf();
    }

    let stem = candidate.file_stem().unwrap_or_default();
    let ext = candidate.extension();

    (1u64..)
        .map(|n| {
            let mut name = OsString::from(stem);
            name.push(format!(" ({n})"));
            if let Some(ext) = ext {
                name.push(".");
                name.push(ext);
            }
            candidate.with_file_name(name)
        })
        .find(|path| !occupied(path))
        .unwrap_or_else(|| candidate.to_path_buf())
}

// symlink_metadata so dangling links count as taken
fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
