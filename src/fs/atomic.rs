//! Atomic file writes.
//!
//! Published sensor state and the registry file are replaced as a unit: a
//! reader must never observe a half-written payload, and a crash must never
//! leave a corrupted file behind. All writes follow the same pattern:
//!
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename over the target
//!
//! Source and target must live on the same filesystem for the rename to be
//! atomic. On crash, a leftover temporary file (`.{filename}.tmp`) may remain.

use crate::error::{CmdsenseError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            CmdsenseError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;
    replace_file(&temp_path, path)?;

    Ok(())
}

/// Atomically write a string to a file.
///
/// Convenience wrapper around [`atomic_write`] for string content.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Temporary file path in the same directory as the target.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CmdsenseError::UserError("invalid file path".to_string()))?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}

/// Write content to a file and sync it to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        CmdsenseError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        CmdsenseError::UserError(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        CmdsenseError::UserError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

/// Replace the target file with the source file.
#[cfg(unix)]
fn replace_file(source: &Path, target: &Path) -> Result<()> {
    // On POSIX, rename() is atomic and replaces an existing destination.
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        CmdsenseError::UserError(format!(
            "failed to replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Sync the parent directory so the directory entry is persisted too.
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Replace the target file with the source file.
///
/// Windows rename() fails when the destination exists, so an existing target
/// is removed first. This leaves a small non-atomic window; state files are
/// rewritten every poll tick, so a reader that loses the race simply retries.
#[cfg(windows)]
fn replace_file(source: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        let _ = fs::remove_file(target);
    }
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        CmdsenseError::UserError(format!(
            "failed to replace '{}': {}",
            target.display(),
            e
        ))
    })
}
