// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Epoch index: integer-keyed symlink partitions over closed issues.
//!
//! `epochs/<N>/<slug>` links resolve to `../../closed/<slug>`; the
//! `epochs/current` symlink names the active epoch. The first closure
//! bootstraps epoch 1.
//!
//! None of these helpers take the walk lock themselves except
//! [`WalkStore::increment_epoch`]; the lock file is a whole-process flock,
//! so nesting acquisitions from one operation would self-deadlock.

use crate::error::StoreError;
use crate::paths;
use crate::walk::WalkStore;
use std::collections::BTreeMap;
use std::path::Path;
use wk_core::{Clock, Slug};

impl<C: Clock> WalkStore<C> {
    /// The epoch named by `epochs/current`, if any.
    ///
    /// Re-resolved on every call; concurrent updates are visible
    /// immediately.
    pub fn current_epoch(&self) -> Option<u64> {
        let link = self.epochs_dir().join(paths::CURRENT_LINK);
        let target = std::fs::read_link(link).ok()?;
        target.to_str()?.parse().ok()
    }

    /// Advance to a fresh epoch under the walk lock.
    ///
    /// The new value is strictly greater than every existing epoch
    /// directory, so `current` never moves backwards even if the symlink
    /// was tampered with.
    pub fn increment_epoch(&self) -> Result<u64, StoreError> {
        let _lock = self.lock()?;
        let new = self.max_epoch().unwrap_or(0) + 1;
        std::fs::create_dir_all(self.epochs_dir().join(new.to_string()))?;
        self.set_current_link(new)?;
        tracing::info!(epoch = new, "epoch advanced");
        Ok(new)
    }

    /// Create the `epochs/<epoch>/<slug>` closure symlink. Idempotent.
    pub fn record_closure_in_epoch(&self, slug: &Slug, epoch: u64) -> Result<(), StoreError> {
        let dir = self.epochs_dir().join(epoch.to_string());
        std::fs::create_dir_all(&dir)?;
        let link = dir.join(slug.as_str());
        if link.symlink_metadata().is_ok() {
            return Ok(());
        }
        std::os::unix::fs::symlink(
            format!("../../{}/{}", paths::CLOSED_DIR, slug.as_str()),
            &link,
        )?;
        Ok(())
    }

    /// All epochs with the slugs closed in each, sorted ascending.
    pub fn epochs(&self) -> BTreeMap<u64, Vec<Slug>> {
        let mut map = BTreeMap::new();
        let Ok(entries) = std::fs::read_dir(self.epochs_dir()) else {
            return map;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(epoch) = name.to_str().and_then(|s| s.parse::<u64>().ok()) else {
                continue;
            };
            let mut slugs = read_epoch_slugs(&entry.path());
            slugs.sort();
            map.insert(epoch, slugs);
        }
        map
    }

    /// Current epoch, bootstrapping epoch 1 when none exists.
    ///
    /// Caller must hold the walk lock.
    pub(crate) fn ensure_current_epoch_locked(&self) -> Result<u64, StoreError> {
        if let Some(epoch) = self.current_epoch() {
            return Ok(epoch);
        }
        let first = self.max_epoch().unwrap_or(0).max(1);
        std::fs::create_dir_all(self.epochs_dir().join(first.to_string()))?;
        self.set_current_link(first)?;
        tracing::info!(epoch = first, "bootstrapped first epoch");
        Ok(first)
    }

    fn max_epoch(&self) -> Option<u64> {
        let entries = std::fs::read_dir(self.epochs_dir()).ok()?;
        entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u64>().ok())
            .max()
    }

    /// Atomically repoint `epochs/current`: stage a temp symlink, rename over.
    fn set_current_link(&self, epoch: u64) -> Result<(), StoreError> {
        let dir = self.epochs_dir();
        let tmp = dir.join(".current.tmp");
        let _ = std::fs::remove_file(&tmp);
        std::os::unix::fs::symlink(epoch.to_string(), &tmp)?;
        std::fs::rename(&tmp, dir.join(paths::CURRENT_LINK))?;
        Ok(())
    }
}

fn read_epoch_slugs(dir: &Path) -> Vec<Slug> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|entry| Slug::parse(entry.file_name().to_str()?).ok())
        .collect()
}

#[cfg(test)]
#[path = "epochs_tests.rs"]
mod tests;
