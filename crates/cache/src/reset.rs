//! Removal of every file that belongs to a namespace.

use crate::identity::Namespace;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

/// Remove every file in `folder` whose name starts with `<namespace>.`.
///
/// This covers the database itself as well as the engine's side files
/// (`-wal`, `-shm`, `-journal`). Best-effort: failures are logged and the
/// remaining files are still attempted. Returns how many files were removed.
pub fn remove_namespace_files(folder: &Path, namespace: &Namespace) -> usize {
    let prefix = format!("{namespace}.");
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(error) if error.kind() == IoErrorKind::NotFound => {
            tracing::debug!(path = %folder.display(), "No cache folder to reset");
            return 0;
        },
        Err(error) => {
            tracing::warn!(path = %folder.display(), %error, "Could not list cache folder");
            return 0;
        },
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let matches = entry.file_name().to_str().is_some_and(|name| name.starts_with(&prefix));
        if !matches {
            continue;
        }
        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed cache file");
                removed += 1;
            },
            Err(error) => tracing::warn!(path = %path.display(), %error, "Could not remove cache file"),
        }
    }
    removed
}
