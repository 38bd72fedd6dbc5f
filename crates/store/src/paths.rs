// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Walk directory layout: file and directory names.

/// Walk metadata file (frontmatter header + goals body).
pub const WALK_FILE: &str = "_walk.md";
/// Open issue partition.
pub const OPEN_DIR: &str = "open";
/// Closed issue partition.
pub const CLOSED_DIR: &str = "closed";
/// Epoch symlink index.
pub const EPOCHS_DIR: &str = "epochs";
/// Symlink naming the current epoch.
pub const CURRENT_LINK: &str = "current";
/// Memories JSON file.
pub const MEMORIES_FILE: &str = "memories.json";
/// Proposals JSON file.
pub const PROPOSALS_FILE: &str = "proposals.json";
/// Advisory lock file guarding multi-step mutations.
pub const LOCK_FILE: &str = ".walk.lock";
/// Driver PID file.
pub const PID_FILE: &str = ".driver.pid";
/// Summary written on finalize.
pub const SUMMARY_FILE: &str = "summary.md";
/// Planner result file, consumed and deleted by the driver.
pub const PLANNING_RESULT_FILE: &str = "_planning_result.md";
/// Restart marker; presence makes the driver exit with code 42.
pub const RESTART_MARKER: &str = "_restart_requested";
/// Optional context file prepended to worker prompts.
pub const CONTEXT_FILE: &str = "_context.md";
/// Walk-root directory of live-log symlinks, one per running issue.
pub const LIVE_RUNS_DIR: &str = "runs";
/// Walk-root directory of planner run artifacts.
pub const PLANNING_DIR: &str = "planning";

/// Issue metadata file.
pub const ISSUE_FILE: &str = "issue.md";
/// Append-only comment log.
pub const COMMENTS_FILE: &str = "comments.md";
/// Blocking-dependency symlink directory.
pub const BLOCKED_BY_DIR: &str = "blocked_by";
/// Provenance symlink directory.
pub const DERIVED_FROM_DIR: &str = "derived_from";
/// Per-issue run artifact directory.
pub const RUNS_DIR: &str = "runs";
/// Closure metadata (yaml frontmatter fields only).
pub const CLOSE_META_FILE: &str = "close.meta";
/// Close result file; first line is the close reason.
pub const RESULT_FILE: &str = "result";
/// Marker set by the retry policy; delete to unblock.
pub const BLOCKED_MARKER: &str = "blocked_by_driver";
/// Priority-bump marker.
pub const NEXT_MARKER: &str = ".next";
