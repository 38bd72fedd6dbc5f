// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Walk metadata: header frontmatter and driver tunables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Terminal and non-terminal walk states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkStatus {
    Open,
    Completed,
    Stalled,
    Stopped,
}

impl WalkStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WalkStatus::Open)
    }
}

impl fmt::Display for WalkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkStatus::Open => write!(f, "open"),
            WalkStatus::Completed => write!(f, "completed"),
            WalkStatus::Stalled => write!(f, "stalled"),
            WalkStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Frontmatter of `_walk.md`; the body below it holds the walk goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkHeader {
    pub title: String,
    pub status: WalkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub config: WalkConfig,
}

impl WalkHeader {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: WalkStatus::Open,
            finished_at: None,
            finish_reason: None,
            config: WalkConfig::default(),
        }
    }
}

/// Driver tunables carried in the walk header.
///
/// Every field has a default so a scaffolded walk can omit the whole block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Worker parallelism; 1 selects the sequential loop.
    pub max_concurrent: u32,
    /// Seconds slept between driver iterations.
    pub sleep_secs: u64,
    /// Consecutive no-progress planning rounds before the walk stalls.
    pub max_planning_rounds: u32,
    /// Consecutive worker failures before an issue is driver-blocked.
    pub max_failures: u32,
    /// Initial adaptive planning threshold in bytes.
    pub planning_threshold: u64,
    /// Byte budget for the planner's recently-closed table.
    pub planner_context_bytes: u64,
    /// Worker command template, run via `sh -c`; may reference `${turns}`.
    pub agent_cmd: String,
    /// Planner command template; falls back to `agent_cmd` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planner_cmd: Option<String>,
    /// Capture mode: collect stdout/stderr instead of streaming JSON to a log.
    pub capture: bool,
    /// Base turn budget substituted for `${turns}` in capture mode.
    pub capture_turns: u32,
    /// Issue types whose turn budget is doubled (verification-heavy work).
    pub verify_types: Vec<String>,
    /// Issue types that receive the self-modification protocol in prompts.
    pub self_types: Vec<String>,
    /// Parent walk directory; the driver stops when the parent is no longer open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<PathBuf>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            sleep_secs: 5,
            max_planning_rounds: 3,
            max_failures: 3,
            planning_threshold: 15_000,
            planner_context_bytes: 20_000,
            agent_cmd: "claude -p --output-format stream-json --verbose".to_string(),
            planner_cmd: None,
            capture: false,
            capture_turns: 40,
            verify_types: vec![
                "fix".to_string(),
                "ablation".to_string(),
                "self".to_string(),
            ],
            self_types: vec!["self".to_string()],
            parent: None,
        }
    }
}

impl WalkConfig {
    /// Effective planner command.
    pub fn planner_command(&self) -> &str {
        self.planner_cmd.as_deref().unwrap_or(&self.agent_cmd)
    }

    /// Capture-mode turn budget for an issue type.
    pub fn turns_for_type(&self, issue_type: &str) -> u32 {
        if self.verify_types.iter().any(|t| t == issue_type) {
            self.capture_turns * 2
        } else {
            self.capture_turns
        }
    }
}

#[cfg(test)]
#[path = "walk_tests.rs"]
mod tests;
