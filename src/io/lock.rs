//! Lock file primitives for single-instance enforcement.
//!
//! The lock is an advisory `flock` held for the lifetime of the daemon. The
//! file body records who holds it (see [`super::instance::InstanceInfo`]) so
//! CLI commands can find the running daemon's PID and config directory.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::constants::LOCK_FILE_NAME;
use crate::common::utils;

/// An exclusively locked file. The lock is released when this is dropped.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Try to take the lock without blocking.
    ///
    /// Returns `Ok(None)` if another process holds it. Existing contents are
    /// left alone until the lock is ours.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open lock file {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(_) => Ok(None),
        }
    }

    /// Replace the file body.
    pub fn write(&mut self, contents: &str) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(contents.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlock and remove the file.
    pub fn release(self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Location of the daemon lock file.
pub fn get_main_lock_path() -> PathBuf {
    utils::runtime_dir().join(LOCK_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_is_refused_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baywake.lock");

        let mut first = LockFile::try_acquire(&path).unwrap().unwrap();
        first.write("123\n\n").unwrap();
        assert!(LockFile::try_acquire(&path).unwrap().is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "123\n\n");

        first.release();
        assert!(!path.exists());
        assert!(LockFile::try_acquire(&path).unwrap().is_some());
    }

    #[test]
    fn test_write_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("baywake.lock");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "a much longer stale body\nfrom before\n").unwrap();

        let mut lock = LockFile::try_acquire(&path).unwrap().unwrap();
        lock.write("42\n").unwrap();
        assert_eq!(std::fs::read_to_string(lock.path()).unwrap(), "42\n");
    }
}
