/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::lock
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Serialise tracker read-modify-write cycles across
    concurrent invocations with an advisory file lock.

  Security / Safety Notes:
    Exclusive lock on a sidecar file; released when the handle
    drops, including on panic unwinding or exit.

  Dependencies:
    fs2 for portable advisory file locks.

  Operational Scope:
    Held by the tracker from load until persist completes.

  Revision History:
    2025-11-12 COD  Introduced tracker state lock.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Single writer per state file
    - Lock lifetime bound to ownership
============================================================*/

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Result, SynupdError};

/// Exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Block until the exclusive lock on `path` is held.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive().map_err(|err| {
            SynupdError::Filesystem(format!("Failed to lock {}: {err}", path.display()))
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Take the lock only if nobody else holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(SynupdError::Filesystem(format!(
                "Failed to lock {}: {err}",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            SynupdError::Filesystem(format!(
                "Failed to create lock directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|err| {
            SynupdError::Filesystem(format!(
                "Failed to open lock file {}: {err}",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("updates.json.lock");

        let lock = StateLock::acquire(&path).unwrap();
        assert_eq!(lock.path(), path.as_path());
        assert!(StateLock::try_acquire(&path).unwrap().is_none());

        drop(lock);
        let relocked = StateLock::try_acquire(&path).unwrap();
        assert!(relocked.is_some());
    }
}
