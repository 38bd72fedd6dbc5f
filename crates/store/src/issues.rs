// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue lifecycle: create, close, comment, readiness, markers, links.
//!
//! An issue is a directory. Closing is a single atomic rename from `open/`
//! to `closed/`. Readers tolerate `ENOENT` on every child access because a
//! concurrent worker may complete that rename between the `readdir` and the
//! child open.

use crate::error::StoreError;
use crate::frontmatter;
use crate::paths;
use crate::walk::WalkStore;
use fs2::FileExt;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use wk_core::{
    Clock, Closure, Issue, IssueMeta, IssueStatus, RunRecord, Signal, Slug, EPIC_TYPE,
};

/// Request payload for [`WalkStore::create`].
#[derive(Debug, Clone)]
pub struct CreateIssue {
    pub slug: Slug,
    pub title: String,
    pub body: String,
    pub issue_type: Option<String>,
    pub priority: u32,
    pub blocked_by: BTreeSet<Slug>,
    pub derived_from: BTreeSet<Slug>,
}

impl CreateIssue {
    pub fn new(slug: Slug, title: impl Into<String>) -> Self {
        Self {
            slug,
            title: title.into(),
            body: String::new(),
            issue_type: None,
            priority: 1,
            blocked_by: BTreeSet::new(),
            derived_from: BTreeSet::new(),
        }
    }
}

/// True when an IO error is a vanished-path condition worth skipping.
fn is_enoent(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound
}

impl<C: Clock> WalkStore<C> {
    /// Create an open issue.
    ///
    /// Fails with `AlreadyExists` if the slug is present in `open/` or
    /// `closed/`. Link referents are recorded by name and are not required
    /// to exist yet.
    pub fn create(&self, req: CreateIssue) -> Result<Issue, StoreError> {
        let _lock = self.lock()?;

        let slug = req.slug.as_str();
        if self.open_issue_dir(slug).exists() || self.closed_issue_dir(slug).exists() {
            return Err(StoreError::AlreadyExists(slug.to_string()));
        }

        let dir = self.open_issue_dir(slug);
        std::fs::create_dir_all(&dir)?;

        let meta = IssueMeta {
            title: req.title.clone(),
            issue_type: req.issue_type.clone(),
            priority: req.priority,
        };
        frontmatter::write(&dir.join(paths::ISSUE_FILE), &meta, &req.body)?;

        write_links(&dir.join(paths::BLOCKED_BY_DIR), &req.blocked_by)?;
        write_links(&dir.join(paths::DERIVED_FROM_DIR), &req.derived_from)?;

        tracing::info!(slug, priority = req.priority, "issue created");
        self.load_issue_at(&dir, req.slug, IssueStatus::Open)
    }

    /// Close an open issue: atomic rename into `closed/` plus closure
    /// metadata, result file, and epoch symlink.
    pub fn close_issue(
        &self,
        slug: &Slug,
        reason: &str,
        signal: Signal,
    ) -> Result<Closure, StoreError> {
        let _lock = self.lock()?;

        let open_dir = self.open_issue_dir(slug.as_str());
        if !open_dir.is_dir() {
            return Err(StoreError::NotOpen(slug.to_string()));
        }

        let epoch = self.ensure_current_epoch_locked()?;
        let closure = Closure {
            reason: reason.to_string(),
            signal,
            epoch,
            closed_at: self.now(),
        };

        // Stage closure artifacts inside the open directory, then rename.
        let _ = std::fs::remove_file(open_dir.join(paths::NEXT_MARKER));
        frontmatter::write(&open_dir.join(paths::CLOSE_META_FILE), &closure, "")?;
        let result_path = open_dir.join(paths::RESULT_FILE);
        if !result_path.exists() {
            std::fs::write(&result_path, format!("{reason}\n"))?;
        }

        let closed_dir = self.closed_issue_dir(slug.as_str());
        std::fs::rename(&open_dir, &closed_dir)?;

        self.record_closure_in_epoch(slug, epoch)?;

        tracing::info!(slug = %slug, epoch, signal = %signal, "issue closed");
        Ok(closure)
    }

    /// Append a timestamped comment section.
    ///
    /// Locks `comments.md` itself (not the walk lock) so comments can be
    /// written concurrently with unrelated store operations.
    pub fn add_comment(&self, slug: &Slug, text: &str) -> Result<(), StoreError> {
        let dir = self
            .find_issue_dir(slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(paths::COMMENTS_FILE))?;
        file.lock_exclusive()?;
        let mut file = file;
        let stamp = self.now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let body = text.trim_end();
        writeln!(file, "## {stamp}\n\n{body}\n")?;
        let _ = fs2::FileExt::unlock(&file);
        Ok(())
    }

    /// Read the comment log, if any.
    pub fn read_comments(&self, slug: &Slug) -> Option<String> {
        let dir = self.find_issue_dir(slug)?;
        std::fs::read_to_string(dir.join(paths::COMMENTS_FILE)).ok()
    }

    /// Load one issue, searching `open/` first, then `closed/`.
    pub fn show(&self, slug: &Slug) -> Result<Issue, StoreError> {
        let open_dir = self.open_issue_dir(slug.as_str());
        if open_dir.is_dir() {
            return self.load_issue_at(&open_dir, slug.clone(), IssueStatus::Open);
        }
        let closed_dir = self.closed_issue_dir(slug.as_str());
        if closed_dir.is_dir() {
            return self.load_issue_at(&closed_dir, slug.clone(), IssueStatus::Closed);
        }
        Err(StoreError::NotFound(slug.to_string()))
    }

    /// Sorted listing of one partition.
    ///
    /// Open issues sort ready-first then by priority; closed issues sort by
    /// close time.
    pub fn list(&self, status: IssueStatus) -> Result<Vec<Issue>, StoreError> {
        let mut issues = self.scan(status);
        match status {
            IssueStatus::Open => {
                let open_slugs: BTreeSet<Slug> =
                    issues.iter().map(|issue| issue.slug.clone()).collect();
                issues.sort_by_cached_key(|issue| {
                    let ready = issue_is_ready(issue, &open_slugs);
                    (if ready { 0u8 } else { 1u8 }, issue.ready_key())
                });
            }
            IssueStatus::Closed => {
                issues.sort_by_key(|issue| {
                    issue.closure.as_ref().map(|c| (c.closed_at, c.epoch))
                });
            }
        }
        Ok(issues)
    }

    /// Open issues eligible for dispatch, in stable priority order.
    ///
    /// Excludes driver-blocked issues, issues with an open blocking
    /// referent, and the reserved container type.
    pub fn ready_issues(&self) -> Result<Vec<Issue>, StoreError> {
        let issues = self.scan(IssueStatus::Open);
        let open_slugs: BTreeSet<Slug> = issues.iter().map(|issue| issue.slug.clone()).collect();
        let mut ready: Vec<Issue> = issues
            .into_iter()
            .filter(|issue| issue_is_ready(issue, &open_slugs))
            .collect();
        ready.sort_by_key(|issue| issue.ready_key());
        Ok(ready)
    }

    /// Set the priority-bump marker.
    pub fn set_priority_override(&self, slug: &Slug) -> Result<(), StoreError> {
        let dir = self
            .find_issue_dir(slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
        std::fs::write(dir.join(paths::NEXT_MARKER), "")?;
        Ok(())
    }

    /// Add a blocking link after creation.
    pub fn block(&self, slug: &Slug, dep: &Slug) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        let dir = self.open_issue_dir(slug.as_str());
        if !dir.is_dir() {
            return Err(StoreError::NotOpen(slug.to_string()));
        }
        let link_dir = dir.join(paths::BLOCKED_BY_DIR);
        std::fs::create_dir_all(&link_dir)?;
        let link = link_dir.join(dep.as_str());
        if !link.exists() {
            symlink_relative(&format!("../../{}", dep.as_str()), &link)?;
        }
        Ok(())
    }

    /// Write the driver block marker. The marker text names the failing
    /// runs and tells a human how to unblock (delete the file).
    pub fn block_by_driver(&self, slug: &Slug, marker_text: &str) -> Result<(), StoreError> {
        let dir = self.open_issue_dir(slug.as_str());
        if !dir.is_dir() {
            return Err(StoreError::NotOpen(slug.to_string()));
        }
        std::fs::write(dir.join(paths::BLOCKED_MARKER), marker_text)?;
        tracing::warn!(slug = %slug, "issue blocked by driver");
        Ok(())
    }

    /// Remove the driver block marker.
    pub fn unblock_driver(&self, slug: &Slug) -> Result<(), StoreError> {
        let dir = self
            .find_issue_dir(slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
        match std::fs::remove_file(dir.join(paths::BLOCKED_MARKER)) {
            Ok(()) => Ok(()),
            Err(ref e) if is_enoent(e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Scan one partition, skipping entries that vanish or fail to parse.
    pub(crate) fn scan(&self, status: IssueStatus) -> Vec<Issue> {
        let dir = match status {
            IssueStatus::Open => self.open_dir(),
            IssueStatus::Closed => self.closed_dir(),
        };
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut issues = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Ok(slug) = Slug::parse(name) else {
                tracing::debug!(name, "skipping non-slug entry");
                continue;
            };
            match self.load_issue_at(&entry.path(), slug, status) {
                Ok(issue) => issues.push(issue),
                Err(StoreError::Io(ref e)) if is_enoent(e) => {
                    // Moved between readdir and open; the other partition owns it now.
                    continue;
                }
                Err(e) => {
                    tracing::warn!(name, error = %e, "skipping unreadable issue");
                    continue;
                }
            }
        }
        issues
    }

    pub(crate) fn find_issue_dir(&self, slug: &Slug) -> Option<std::path::PathBuf> {
        let open_dir = self.open_issue_dir(slug.as_str());
        if open_dir.is_dir() {
            return Some(open_dir);
        }
        let closed_dir = self.closed_issue_dir(slug.as_str());
        if closed_dir.is_dir() {
            return Some(closed_dir);
        }
        None
    }

    pub(crate) fn load_issue_at(
        &self,
        dir: &Path,
        slug: Slug,
        status: IssueStatus,
    ) -> Result<Issue, StoreError> {
        let (meta, body): (IssueMeta, String) = frontmatter::read(&dir.join(paths::ISSUE_FILE))?;

        let closure = match frontmatter::read::<Closure>(&dir.join(paths::CLOSE_META_FILE)) {
            Ok((closure, _)) => Some(closure),
            Err(StoreError::Io(ref e)) if is_enoent(e) => None,
            Err(e) => {
                tracing::warn!(slug = %slug, error = %e, "unreadable close metadata");
                None
            }
        };

        Ok(Issue {
            blocked_by: read_links(&dir.join(paths::BLOCKED_BY_DIR)),
            derived_from: read_links(&dir.join(paths::DERIVED_FROM_DIR)),
            runs: read_runs(&dir.join(paths::RUNS_DIR)),
            priority_override: dir.join(paths::NEXT_MARKER).exists(),
            blocked_by_driver: dir.join(paths::BLOCKED_MARKER).exists(),
            slug,
            status,
            meta,
            body,
            closure,
        })
    }
}

/// Readiness rule shared by `ready_issues` and the `list` sort.
fn issue_is_ready(issue: &Issue, open_slugs: &BTreeSet<Slug>) -> bool {
    if issue.blocked_by_driver {
        return false;
    }
    if issue.issue_type() == EPIC_TYPE {
        return false;
    }
    !issue
        .blocked_by
        .iter()
        .any(|dep| open_slugs.contains(dep))
}

/// Record link names as relative symlinks under `dir`.
fn write_links(dir: &Path, targets: &BTreeSet<Slug>) -> Result<(), StoreError> {
    if targets.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    for target in targets {
        let link = dir.join(target.as_str());
        if !link.exists() {
            symlink_relative(&format!("../../{}", target.as_str()), &link)?;
        }
    }
    Ok(())
}

/// Read link names from a symlink directory. Targets may dangle once the
/// referent closes; only the names are authoritative.
fn read_links(dir: &Path) -> BTreeSet<Slug> {
    let mut links = BTreeSet::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return links;
    };
    for entry in entries.flatten() {
        if let Some(name) = entry.file_name().to_str() {
            if let Ok(slug) = Slug::parse(name) {
                links.insert(slug);
            }
        }
    }
    links
}

/// Read run records ordered by start time, skipping malformed metadata.
fn read_runs(dir: &Path) -> Vec<RunRecord> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut runs = Vec::new();
    for entry in entries.flatten() {
        let meta_path = entry.path().join("meta");
        let text = match std::fs::read_to_string(&meta_path) {
            Ok(text) => text,
            Err(_) => continue,
        };
        match serde_json::from_str::<RunRecord>(&text) {
            Ok(record) => runs.push(record),
            Err(e) => {
                tracing::warn!(path = %meta_path.display(), error = %e, "skipping malformed run meta");
            }
        }
    }
    runs.sort_by_key(|run| run.started_at);
    runs
}

fn symlink_relative(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(test)]
#[path = "issues_tests.rs"]
mod tests;
