// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planner prompt assembly.

use std::fmt::Write;
use wk_core::Signal;
use wk_store::WalkSnapshot;

/// How many epochs back a dead memory still shows (struck through).
const DEAD_MEMORY_WINDOW: u64 = 2;

/// Compose the planner prompt from a snapshot.
pub fn build_planner_prompt(snapshot: &WalkSnapshot) -> String {
    let mut out = String::with_capacity(16 * 1024);

    epoch_status(&mut out, snapshot);
    goals(&mut out, snapshot);
    recently_closed(&mut out, snapshot);
    open_issues(&mut out, snapshot);
    memories(&mut out, snapshot);
    proposals(&mut out, snapshot);
    context_pressure(&mut out, snapshot);
    out.push_str(PROTOCOL_BLOCK);

    out
}

fn epoch_status(out: &mut String, snapshot: &WalkSnapshot) {
    let current = snapshot.current_epoch.unwrap_or(0);
    let mut parts: Vec<String> = Vec::new();
    for (epoch, slugs) in &snapshot.epochs {
        parts.push(format!("{} ({} closed)", epoch, slugs.len()));
    }
    let listing = if parts.is_empty() {
        "none yet".to_string()
    } else {
        parts.join(", ")
    };
    let _ = writeln!(
        out,
        "You are the planner for this walk. Current epoch: {current}. Epochs: {listing}."
    );
    out.push('\n');
}

fn goals(out: &mut String, snapshot: &WalkSnapshot) {
    let _ = writeln!(out, "# Goals: {}", snapshot.header.title);
    out.push('\n');
    let goals = snapshot.goals.trim_end();
    if !goals.is_empty() {
        out.push_str(goals);
        out.push_str("\n\n");
    }
}

fn recently_closed(out: &mut String, snapshot: &WalkSnapshot) {
    if snapshot.recent_closed.is_empty() {
        return;
    }

    out.push_str("# Recently closed\n\n");
    let _ = writeln!(
        out,
        "Newest first, within the {}-byte context window.",
        snapshot.context_budget
    );
    out.push('\n');
    out.push_str("| epoch | issue | title | signal | bytes |\n");
    out.push_str("|---|---|---|---|---|\n");

    let mut highlights: Vec<String> = Vec::new();
    for group in &snapshot.recent_closed {
        for issue in &group.issues {
            let slug_cell = match snapshot.parent_annotation(&issue.slug) {
                Some(parents) => format!("{} (from {})", issue.slug, parents),
                None => issue.slug.to_string(),
            };
            let signal_cell = match issue.signal {
                Signal::Routine => String::new(),
                other => other.to_string(),
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                group.epoch, slug_cell, issue.title, signal_cell, issue.bytes
            );
            if issue.signal != Signal::Routine {
                highlights.push(format!(
                    "- **{}**: {} ({})",
                    issue.signal, issue.slug, issue.title
                ));
            }
        }
    }
    out.push('\n');

    if !highlights.is_empty() {
        out.push_str("Signals to weigh:\n\n");
        for line in highlights {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
}

fn open_issues(out: &mut String, snapshot: &WalkSnapshot) {
    out.push_str("# Still open\n\n");
    if snapshot.open_issues.is_empty() {
        out.push_str("The queue is empty.\n\n");
        return;
    }
    for issue in &snapshot.open_issues {
        let annotation = match snapshot.parent_annotation(&issue.slug) {
            Some(parents) => format!(" (from {parents})"),
            None => String::new(),
        };
        let _ = writeln!(
            out,
            "- {} [p{}]{}: {}",
            issue.slug, issue.meta.priority, annotation, issue.meta.title
        );
    }
    out.push('\n');
}

fn memories(out: &mut String, snapshot: &WalkSnapshot) {
    let epoch = snapshot.current_epoch.unwrap_or(0);
    let alive: Vec<_> = snapshot
        .memories
        .iter()
        .filter(|memory| memory.alive_at(epoch))
        .collect();
    let dead: Vec<_> = snapshot
        .memories
        .iter()
        .filter(|memory| memory.recently_dead_at(epoch, DEAD_MEMORY_WINDOW))
        .collect();

    if alive.is_empty() && dead.is_empty() {
        return;
    }

    out.push_str("# Memories\n\n");
    if !alive.is_empty() {
        out.push_str("| key | text | alive since |\n");
        out.push_str("|---|---|---|\n");
        for memory in &alive {
            let _ = writeln!(out, "| {} | {} | {} |", memory.key, memory.text, memory.alive_from);
        }
        out.push('\n');
    }
    for memory in &dead {
        let until = memory.alive_until.unwrap_or(0);
        let _ = writeln!(out, "~~{}: {}~~ (died at epoch {})", memory.key, memory.text, until);
    }
    if !dead.is_empty() {
        out.push('\n');
    }

    let bytes: usize = alive
        .iter()
        .map(|memory| memory.key.len() + memory.text.len())
        .sum();
    let _ = writeln!(out, "Alive memory size: {bytes} bytes.");
    out.push('\n');
}

fn proposals(out: &mut String, snapshot: &WalkSnapshot) {
    if snapshot.proposals.is_empty() {
        return;
    }
    out.push_str("# Pending memory proposals\n\n");
    out.push_str("| key | text | proposed by | epoch |\n");
    out.push_str("|---|---|---|---|\n");
    for proposal in &snapshot.proposals {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            proposal.key,
            proposal.text,
            proposal.proposed_by.as_deref().unwrap_or("-"),
            proposal.epoch
        );
    }
    out.push('\n');
}

fn context_pressure(out: &mut String, snapshot: &WalkSnapshot) {
    let Some(ref overall) = snapshot.stats.overall else {
        return;
    };

    out.push_str("# Context pressure\n\n");
    out.push_str(
        "Expansion ratio = closed bytes (result + comments) over initial body bytes.\n\n",
    );
    out.push_str("| type | count | median | p75 |\n");
    out.push_str("|---|---|---|---|\n");
    for (issue_type, stats) in &snapshot.stats.by_type {
        let _ = writeln!(
            out,
            "| {} | {} | {:.1} | {:.1} |",
            issue_type, stats.count, stats.median, stats.p75
        );
    }
    let _ = writeln!(
        out,
        "| (all) | {} | {:.1} | {:.1} |",
        overall.count, overall.median, overall.p75
    );
    out.push('\n');
    let _ = writeln!(
        out,
        "Every byte an issue expands into competes for the {}-byte planning window. \
         Budget new issue bodies accordingly.",
        snapshot.context_budget
    );
    out.push('\n');
}

const PROTOCOL_BLOCK: &str = "\
# Your task

1. Assess progress against the goals above.
2. Explore: read closed results that look load-bearing, follow discovery
   links, and check the open queue for stale work.
3. Expand and critically evaluate the closed issues: did the results
   actually answer what the issue asked? Close the gap with follow-ups
   where they did not.
3.5. Meta-evaluate the system itself: if the issue flow, prompts, or
   tooling are wasting worker effort, create an issue to fix the system.
4. Create the next batch of issues with `wk new`, ordered by criticality,
   staying within the remaining byte budget. Accept or discard pending
   memory proposals with `wk accept` / `wk discard`.
5. Verify what you created, then write `_planning_result.md` in the walk
   root:

    ---
    outcome: created_issues | completed | no_work_found
    reason: one line
    ---

Use `completed` only when the goals are met and nothing is left to learn.
";

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
