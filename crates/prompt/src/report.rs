// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Markdown renderers over store snapshots: summary, status, history.

use chrono::SecondsFormat;
use std::fmt::Write;
use wk_core::Signal;
use wk_store::WalkSnapshot;

/// The walk summary written on finalize.
pub fn render_summary(snapshot: &WalkSnapshot) -> String {
    let mut out = String::with_capacity(4096);
    let header = &snapshot.header;

    let _ = writeln!(out, "# Summary: {}", header.title);
    out.push('\n');
    let _ = writeln!(out, "Status: {}", header.status);
    if let Some(reason) = &header.finish_reason {
        let _ = writeln!(out, "Reason: {reason}");
    }
    if let Some(finished_at) = header.finished_at {
        let _ = writeln!(
            out,
            "Finished: {}",
            finished_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "Totals: {} closed, {} open, {} runs, ${:.2} spent.",
        snapshot.closed_issues.len(),
        snapshot.open_issues.len(),
        snapshot.total_runs(),
        snapshot.total_cost_usd()
    );
    out.push('\n');

    if !snapshot.closed_issues.is_empty() {
        out.push_str("## Timeline\n\n");
        for issue in &snapshot.closed_issues {
            let Some(closure) = &issue.closure else {
                continue;
            };
            let signal = match closure.signal {
                Signal::Routine => String::new(),
                other => format!(" [{other}]"),
            };
            let _ = writeln!(
                out,
                "- epoch {} · {} · {}{}: {}",
                closure.epoch,
                closure.closed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                issue.slug,
                signal,
                closure.reason
            );
        }
        out.push('\n');
    }

    if !snapshot.open_issues.is_empty() {
        out.push_str("## Left open\n\n");
        for issue in &snapshot.open_issues {
            let _ = writeln!(out, "- {} [p{}]: {}", issue.slug, issue.meta.priority, issue.meta.title);
        }
        out.push('\n');
    }

    out
}

/// One-screen walk status.
pub fn render_status(snapshot: &WalkSnapshot) -> String {
    let mut out = String::new();
    let header = &snapshot.header;

    let _ = writeln!(out, "{} — {}", header.title, header.status);
    let _ = writeln!(
        out,
        "epoch {} · {} open · {} closed",
        snapshot.current_epoch.unwrap_or(0),
        snapshot.open_issues.len(),
        snapshot.closed_issues.len()
    );

    let blocked = snapshot
        .open_issues
        .iter()
        .filter(|issue| issue.blocked_by_driver)
        .count();
    if blocked > 0 {
        let _ = writeln!(out, "{blocked} driver-blocked");
    }

    if !snapshot.open_issues.is_empty() {
        out.push('\n');
        for issue in &snapshot.open_issues {
            let mut flags = String::new();
            if issue.priority_override {
                flags.push_str(" *next*");
            }
            if issue.blocked_by_driver {
                flags.push_str(" *blocked*");
            }
            let _ = writeln!(
                out,
                "  {} [p{}]{}: {}",
                issue.slug, issue.meta.priority, flags, issue.meta.title
            );
        }
    }

    out
}

/// Epoch-by-epoch closure history.
pub fn render_history(snapshot: &WalkSnapshot) -> String {
    let mut out = String::new();

    for (epoch, slugs) in &snapshot.epochs {
        let _ = writeln!(out, "## Epoch {epoch}");
        out.push('\n');
        if slugs.is_empty() {
            out.push_str("(no closures)\n\n");
            continue;
        }
        for slug in slugs {
            let closure = snapshot
                .closed_issues
                .iter()
                .find(|issue| &issue.slug == slug)
                .and_then(|issue| issue.closure.as_ref());
            match closure {
                Some(closure) => {
                    let signal = match closure.signal {
                        Signal::Routine => String::new(),
                        other => format!(" [{other}]"),
                    };
                    let _ = writeln!(out, "- {}{}: {}", slug, signal, closure.reason);
                }
                None => {
                    let _ = writeln!(out, "- {slug}");
                }
            }
        }
        out.push('\n');
    }

    if out.is_empty() {
        out.push_str("No epochs yet.\n");
    }

    out
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
