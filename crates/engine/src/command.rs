// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker command assembly: template interpolation and environment.
//!
//! Prompts are always delivered on stdin — they routinely exceed OS argv
//! limits — so the command template carries flags only.

use std::collections::HashMap;
use std::path::Path;
use wk_core::{Issue, WalkConfig};

/// Environment variable naming the walk directory.
pub const ENV_WALK_DIR: &str = "WALK_DIR";
/// Environment variable naming the issue a worker is assigned to.
pub const ENV_WALK_ISSUE: &str = "WALK_ISSUE";
/// Environment variable marking a planner invocation.
pub const ENV_WALK_PLANNING: &str = "WALK_PLANNING";

/// A fully resolved subprocess invocation, run via `sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub env: Vec<(String, String)>,
}

/// Substitute `${var}` references from the map; unknown references are left
/// verbatim.
pub fn interpolate(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Build the invocation for one worker run against an issue.
pub fn worker_invocation(config: &WalkConfig, walk_root: &Path, issue: &Issue) -> Invocation {
    let mut vars = HashMap::new();
    vars.insert("walk".to_string(), walk_root.display().to_string());
    vars.insert("issue".to_string(), issue.slug.to_string());
    vars.insert(
        "turns".to_string(),
        config.turns_for_type(&issue.issue_type()).to_string(),
    );

    Invocation {
        command: interpolate(&config.agent_cmd, &vars),
        env: vec![
            (ENV_WALK_DIR.to_string(), walk_root.display().to_string()),
            (ENV_WALK_ISSUE.to_string(), issue.slug.to_string()),
        ],
    }
}

/// Build the invocation for a planning round.
pub fn planner_invocation(config: &WalkConfig, walk_root: &Path) -> Invocation {
    let mut vars = HashMap::new();
    vars.insert("walk".to_string(), walk_root.display().to_string());
    vars.insert("turns".to_string(), config.capture_turns.to_string());

    Invocation {
        command: interpolate(config.planner_command(), &vars),
        env: vec![
            (ENV_WALK_DIR.to_string(), walk_root.display().to_string()),
            (ENV_WALK_PLANNING.to_string(), "1".to_string()),
        ],
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
