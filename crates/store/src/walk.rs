// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The walk handle: directory layout, header round-trip, write locking.

use crate::error::StoreError;
use crate::frontmatter;
use crate::paths;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use wk_core::{Clock, SystemClock, WalkHeader, WalkStatus};

/// Handle to a walk directory.
///
/// Cheap to clone; all state lives on disk. One handle per thread is the
/// expected shape in concurrent mode.
#[derive(Debug, Clone)]
pub struct WalkStore<C: Clock = SystemClock> {
    root: PathBuf,
    clock: C,
}

/// Exclusive advisory lock on `.walk.lock`, released on drop.
///
/// Acquisition blocks until the lock is available; there is no timeout.
pub struct WalkLock {
    file: File,
}

impl Drop for WalkLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl WalkStore<SystemClock> {
    /// Open an existing walk directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_clock(root, SystemClock)
    }

    /// Create a new walk directory skeleton and write its header.
    pub fn scaffold(
        root: impl Into<PathBuf>,
        header: &WalkHeader,
        goals: &str,
    ) -> Result<Self, StoreError> {
        Self::scaffold_with_clock(root, header, goals, SystemClock)
    }
}

impl<C: Clock> WalkStore<C> {
    /// Open an existing walk directory with an explicit clock.
    pub fn open_with_clock(root: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.join(paths::WALK_FILE).is_file() {
            return Err(StoreError::NotAWalk { root });
        }
        Ok(Self { root, clock })
    }

    /// Create a new walk directory skeleton with an explicit clock.
    pub fn scaffold_with_clock(
        root: impl Into<PathBuf>,
        header: &WalkHeader,
        goals: &str,
        clock: C,
    ) -> Result<Self, StoreError> {
        let root: PathBuf = root.into();
        std::fs::create_dir_all(&root)?;
        std::fs::create_dir_all(root.join(paths::OPEN_DIR))?;
        std::fs::create_dir_all(root.join(paths::CLOSED_DIR))?;
        std::fs::create_dir_all(root.join(paths::EPOCHS_DIR))?;
        // Touch the lock file so later opens never race its creation
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(root.join(paths::LOCK_FILE))?;
        frontmatter::write(&root.join(paths::WALK_FILE), header, goals)?;
        tracing::info!(root = %root.display(), title = %header.title, "scaffolded walk");
        Ok(Self { root, clock })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Acquire the exclusive walk lock, blocking until available.
    pub fn lock(&self) -> Result<WalkLock, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join(paths::LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(WalkLock { file })
    }

    /// Load the walk header and goals body.
    pub fn load_walk(&self) -> Result<(WalkHeader, String), StoreError> {
        frontmatter::read(&self.root.join(paths::WALK_FILE))
    }

    /// Write the walk header and goals body.
    pub fn save_walk(&self, header: &WalkHeader, goals: &str) -> Result<(), StoreError> {
        frontmatter::write(&self.root.join(paths::WALK_FILE), header, goals)
    }

    /// Transition the walk to a terminal status and record the reason.
    pub fn finalize(&self, status: WalkStatus, reason: &str) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        let (mut header, goals) = self.load_walk()?;
        header.status = status;
        header.finished_at = Some(self.now());
        header.finish_reason = Some(reason.to_string());
        self.save_walk(&header, &goals)?;
        tracing::info!(status = %status, reason, "walk finalized");
        Ok(())
    }

    /// Reset a stalled walk to open on driver re-entry.
    ///
    /// Returns true when the status changed.
    pub fn reopen_if_stalled(&self) -> Result<bool, StoreError> {
        let _lock = self.lock()?;
        let (mut header, goals) = self.load_walk()?;
        if header.status != WalkStatus::Stalled {
            return Ok(false);
        }
        header.status = WalkStatus::Open;
        header.finished_at = None;
        header.finish_reason = None;
        self.save_walk(&header, &goals)?;
        tracing::info!("reopened stalled walk");
        Ok(true)
    }

    /// Optional context file prepended to worker prompts.
    pub fn context_file(&self) -> Option<String> {
        std::fs::read_to_string(self.root.join(paths::CONTEXT_FILE)).ok()
    }

    // Directory helpers

    pub fn open_dir(&self) -> PathBuf {
        self.root.join(paths::OPEN_DIR)
    }

    pub fn closed_dir(&self) -> PathBuf {
        self.root.join(paths::CLOSED_DIR)
    }

    pub fn epochs_dir(&self) -> PathBuf {
        self.root.join(paths::EPOCHS_DIR)
    }

    pub fn open_issue_dir(&self, slug: &str) -> PathBuf {
        self.open_dir().join(slug)
    }

    pub fn closed_issue_dir(&self, slug: &str) -> PathBuf {
        self.closed_dir().join(slug)
    }
}

#[cfg(test)]
#[path = "walk_tests.rs"]
mod tests;
