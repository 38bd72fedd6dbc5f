// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue records: metadata, lifecycle status, and closure annotations.

use crate::run::RunRecord;
use crate::slug::Slug;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Reserved container type; issues of this type never become ready.
pub const EPIC_TYPE: &str = "epic";

/// Lifecycle status of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Closed,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueStatus::Open => write!(f, "open"),
            IssueStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Closure annotation influencing planner scheduling.
///
/// `Pivotal` closures trigger pre-emptive planning; `Surprising` closures
/// trigger it once enough new context has accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    Routine,
    Surprising,
    Pivotal,
}

impl Signal {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "routine" => Some(Signal::Routine),
            "surprising" => Some(Signal::Surprising),
            "pivotal" => Some(Signal::Pivotal),
            _ => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Routine => write!(f, "routine"),
            Signal::Surprising => write!(f, "surprising"),
            Signal::Pivotal => write!(f, "pivotal"),
        }
    }
}

/// Frontmatter of `issue.md`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueMeta {
    pub title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    1
}

impl IssueMeta {
    /// Resolve the effective issue type.
    ///
    /// Precedence: explicit `type` field, then a `word:` title prefix, then
    /// the slug's leading hyphen segment.
    pub fn effective_type(&self, slug: &Slug) -> String {
        if let Some(ref t) = self.issue_type {
            if !t.is_empty() {
                return t.clone();
            }
        }
        if let Some((prefix, _)) = self.title.split_once(':') {
            let prefix = prefix.trim();
            if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_lowercase()) {
                return prefix.to_string();
            }
        }
        slug.type_prefix().to_string()
    }
}

/// Metadata recorded when an issue is closed (`close.meta`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    pub reason: String,
    #[serde(default)]
    pub signal: Signal,
    pub epoch: u64,
    pub closed_at: DateTime<Utc>,
}

/// A fully loaded issue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub slug: Slug,
    pub status: IssueStatus,
    pub meta: IssueMeta,
    pub body: String,
    /// Slugs this issue is gated on; only open referents block readiness.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub blocked_by: BTreeSet<Slug>,
    /// Epistemic provenance links; independent of blocking.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub derived_from: BTreeSet<Slug>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<RunRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure: Option<Closure>,
    /// Priority-bump flag (`.next` marker): sorts ahead of everything else.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub priority_override: bool,
    /// Set by the retry policy after repeated failures.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub blocked_by_driver: bool,
}

impl Issue {
    /// Effective issue type (see [`IssueMeta::effective_type`]).
    pub fn issue_type(&self) -> String {
        self.meta.effective_type(&self.slug)
    }

    /// Ready-queue sort key: bumped issues first, then priority, then slug.
    pub fn ready_key(&self) -> (u8, u32, Slug) {
        (
            if self.priority_override { 0 } else { 1 },
            self.meta.priority,
            self.slug.clone(),
        )
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
