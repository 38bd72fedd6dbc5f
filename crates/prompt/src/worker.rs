// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker prompt assembly.

use std::fmt::Write;
use std::path::Path;
use wk_core::Issue;

/// Everything a worker prompt is composed from.
///
/// Parent issue content is deliberately absent: workers opt into parent
/// context by following their discovery links, never by inheriting it.
#[derive(Debug, Clone)]
pub struct WorkerPromptInput<'a> {
    pub walk_root: &'a Path,
    /// Body of the walk's optional `_context.md`.
    pub context: Option<&'a str>,
    pub walk_title: &'a str,
    pub goals: &'a str,
    pub issue: &'a Issue,
    /// Include the self-modification protocol block.
    pub self_protocol: bool,
}

/// Compose the worker prompt: preamble, context file, walk goals, issue
/// block, protocol epilogue.
pub fn build_worker_prompt(input: &WorkerPromptInput) -> String {
    let mut out = String::with_capacity(4096);
    let issue = input.issue;

    // Preamble
    let _ = writeln!(
        out,
        "You are working inside the walk directory `{}`.",
        input.walk_root.display()
    );
    let _ = writeln!(
        out,
        "Walk-level context, if any, lives in `_context.md` at the walk root and is included below."
    );
    out.push('\n');

    if let Some(context) = input.context {
        let context = context.trim_end();
        if !context.is_empty() {
            out.push_str("# Context\n\n");
            out.push_str(context);
            out.push_str("\n\n");
        }
    }

    // Parent context: the walk's title and goals, never a parent issue's content.
    let _ = writeln!(out, "# Investigation: {}", input.walk_title);
    out.push('\n');
    let goals = input.goals.trim_end();
    if !goals.is_empty() {
        out.push_str(goals);
        out.push_str("\n\n");
    }

    // Issue block
    let _ = writeln!(out, "# Your issue: {}", issue.slug);
    out.push('\n');
    let _ = writeln!(out, "Title: {}", issue.meta.title);
    out.push('\n');
    let body = issue.body.trim_end();
    if !body.is_empty() {
        out.push_str(body);
        out.push_str("\n\n");
    }

    // Epilogue: driver protocol
    out.push_str(PROTOCOL_BLOCK);
    out.push_str(VCS_BLOCK);
    out.push_str(NAMING_BLOCK);
    if input.self_protocol {
        out.push_str(SELF_MODIFICATION_BLOCK);
    }
    out.push_str(SIGNAL_BLOCK);

    out
}

const PROTOCOL_BLOCK: &str = "\
# Protocol

When your work on this issue is finished, close it:

    wk close <slug> --reason \"one-line summary\" [--signal routine|surprising|pivotal]

Record intermediate findings as comments so they survive your session:

    wk comment <slug> \"what you learned\"

If the work uncovers follow-up questions, create derived issues rather than
expanding this one:

    wk new <new-slug> --title \"...\" --derived-from <slug>

Facts that future workers will need can be proposed as memories; the planner
decides whether they become part of every prompt:

    wk propose <key> \"the fact\"

";

const VCS_BLOCK: &str = "\
# Version control

Commit your changes with focused, descriptive messages before closing the
issue. Never leave the working tree dirty; never force-push.

";

const NAMING_BLOCK: &str = "\
# Naming

Sub-issue slugs are lowercase words joined by hyphens, prefixed with their
type (for example `probe-cache-keys`, `fix-retry-loop`). Keep them short and
specific.

";

const SELF_MODIFICATION_BLOCK: &str = "\
# Self-modification

This issue touches the driver's own source. After landing the change, write
the restart marker file `_restart_requested` in the walk root; the
supervisor will pick up the new build on its next spawn.

";

const SIGNAL_BLOCK: &str = "\
# Signalling

When closing, annotate how the result should steer planning:
`routine` (default) for expected outcomes, `surprising` for results that
contradict an assumption, `pivotal` for results that should immediately
reshape the plan. Pivotal closures interrupt the queue and trigger an early
planning round.
";

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
