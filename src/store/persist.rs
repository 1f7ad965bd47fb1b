//! Write-through persistence for the event store.
//!
//! The backing file holds the retained events as a single JSON array,
//! rewritten after every append with the write-to-temp-then-rename
//! pattern so a crash mid-write never leaves a torn file. Both the
//! file and its directory are fsynced: the rename's directory entry is
//! not durable without the directory fsync.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::webhooks::Event;

/// Errors raised by the backing-file layer.
#[derive(Debug, Error)]
pub enum PersistError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Syncs a file's contents and metadata to disk.
fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so a rename's directory entry survives power loss.
fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}

/// Atomically replaces the backing file with the given events.
pub fn save_events(path: &Path, events: &[Event]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let bytes = serde_json::to_vec(events)?;
    let tmp_path = path.with_extension("json.tmp");

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fsync_dir(parent)?;
        }
    }

    Ok(())
}

/// Loads events from the backing file.
///
/// A missing file is an empty history, not an error. A corrupt file is
/// reported so the caller can decide to start empty.
pub fn load_events(path: &Path) -> Result<Vec<Event>, PersistError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(PersistError::Io(e)),
    }
}
