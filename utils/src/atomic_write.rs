//! Atomic file write helpers.
//!
//! Uses a temp file + rename pattern so a reader never observes a half-written
//! result file. On Windows, rename-over-existing fails, so we fall back to
//! backup-and-restore to avoid losing the previous contents.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileSyncPolicy {
    /// fsync the temp file before it is renamed into place.
    SyncAll,
    #[default]
    SkipSync,
}

pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8], sync: FileSyncPolicy) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    if matches!(sync, FileSyncPolicy::SyncAll) {
        tmp.as_file().sync_all()?;
    }

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        // Windows fallback: backup and restore.
        let backup_path = path.with_extension("bak");
        let _ = fs::remove_file(&backup_path);
        fs::rename(path, &backup_path)?;

        if let Err(rename_err) = err.file.persist(path) {
            let _ = fs::rename(&backup_path, path);
            return Err(rename_err.error);
        }
        if let Err(e) = fs::remove_file(&backup_path) {
            tracing::warn!(
                path = %backup_path.display(),
                "Failed to remove .bak after atomic write: {e}"
            );
        }
    }

    Ok(())
}
