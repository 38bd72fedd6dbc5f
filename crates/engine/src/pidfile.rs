// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver PID file: one live driver per walk directory.

use crate::error::DriverError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// An acquired PID file.
///
/// The exclusive lock is held for the driver's lifetime; the file is
/// removed on drop (clean exit). A crashed driver leaves the file behind,
/// but also releases the lock, so the next startup succeeds.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    file: File,
}

impl PidFile {
    /// Acquire the PID file, refusing when another driver holds the lock.
    ///
    /// Open without truncating first — truncating before holding the lock
    /// would wipe a live driver's PID.
    pub fn acquire(path: &Path) -> Result<Self, DriverError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            let pid = std::fs::read_to_string(path)
                .unwrap_or_default()
                .trim()
                .to_string();
            return Err(DriverError::AlreadyRunning { pid });
        }

        file.set_len(0)?;
        let mut file = file;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
