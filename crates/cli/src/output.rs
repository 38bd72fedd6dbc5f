// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering for list/show output.

use chrono::SecondsFormat;
use std::fmt::Write;
use wk_core::{Issue, IssueStatus};

pub fn render_list(issues: &[Issue]) -> String {
    let mut out = String::new();
    for issue in issues {
        match issue.status {
            IssueStatus::Open => {
                let mut flags = String::new();
                if issue.priority_override {
                    flags.push_str(" *next*");
                }
                if issue.blocked_by_driver {
                    flags.push_str(" *blocked*");
                }
                let _ = writeln!(
                    out,
                    "{} [p{}]{}: {}",
                    issue.slug, issue.meta.priority, flags, issue.meta.title
                );
            }
            IssueStatus::Closed => {
                let when = issue
                    .closure
                    .as_ref()
                    .map(|c| c.closed_at.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_else(|| "?".to_string());
                let _ = writeln!(out, "{} ({}): {}", issue.slug, when, issue.meta.title);
            }
        }
    }
    out
}

pub fn render_issue(issue: &Issue, comments: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} — {}", issue.slug, issue.status);
    let _ = writeln!(out, "title: {}", issue.meta.title);
    let _ = writeln!(out, "type: {}", issue.issue_type());
    let _ = writeln!(out, "priority: {}", issue.meta.priority);
    if !issue.blocked_by.is_empty() {
        let deps: Vec<&str> = issue.blocked_by.iter().map(|s| s.as_str()).collect();
        let _ = writeln!(out, "blocked by: {}", deps.join(", "));
    }
    if !issue.derived_from.is_empty() {
        let parents: Vec<&str> = issue.derived_from.iter().map(|s| s.as_str()).collect();
        let _ = writeln!(out, "derived from: {}", parents.join(", "));
    }
    if issue.blocked_by_driver {
        let _ = writeln!(out, "blocked by driver: yes");
    }
    if let Some(closure) = &issue.closure {
        let _ = writeln!(
            out,
            "closed: {} (epoch {}, {})",
            closure.closed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            closure.epoch,
            closure.signal
        );
        let _ = writeln!(out, "reason: {}", closure.reason);
    }
    if !issue.runs.is_empty() {
        let _ = writeln!(out, "runs: {}", issue.runs.len());
    }
    if !issue.body.is_empty() {
        out.push('\n');
        out.push_str(issue.body.trim_end());
        out.push('\n');
    }
    if let Some(comments) = comments {
        out.push('\n');
        out.push_str(comments.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
