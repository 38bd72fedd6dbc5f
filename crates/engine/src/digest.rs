// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digest extraction from a worker's stream-JSON log.
//!
//! The log is one JSON object per line. Malformed lines are tolerated and
//! skipped; a partial digest is always better than none.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use wk_core::TokenUsage;

/// Maximum characters of the terminal result text kept in the digest.
const RESULT_TEXT_LIMIT: usize = 500;

/// Mutating `wk` subcommands worth surfacing in run stats.
const MUTATION_SUBCOMMANDS: &[&str] = &[
    "new", "close", "comment", "block", "unblock", "bump", "propose", "forget", "accept",
    "discard",
];

/// Structured summary of one streaming worker run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunDigest {
    /// Tool-use counts per tool name.
    pub tool_counts: BTreeMap<String, u64>,
    /// Files touched through Write/Edit invocations.
    pub files_modified: BTreeSet<String>,
    /// State-changing `wk` CLI calls observed in Bash commands.
    pub mutation_commands: Vec<String>,
    pub duration_ms: Option<u64>,
    pub num_turns: Option<u64>,
    /// Terminal result text, truncated.
    pub result_text: Option<String>,
    pub cost_usd: Option<f64>,
    pub usage: Option<TokenUsage>,
    /// Subtype of the terminal `result` event, if one was seen.
    pub result_subtype: Option<String>,
}

impl RunDigest {
    /// Run status: the terminal event wins; otherwise derived from the exit
    /// code.
    pub fn status(&self, exit_code: Option<i32>) -> &'static str {
        match self.result_subtype.as_deref() {
            Some("success") => "success",
            Some(_) => "error",
            None if exit_code == Some(0) => "success",
            None => "error",
        }
    }

    pub fn total_tool_calls(&self) -> u64 {
        self.tool_counts.values().sum()
    }
}

/// Parse a stream-JSON log file into a digest.
pub fn digest_stream_log(path: &Path) -> RunDigest {
    let mut digest = RunDigest::default();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return digest,
    };

    let reader = BufReader::new(file);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let json: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(json) => json,
            Err(_) => continue,
        };
        extract_event(&json, &mut digest);
    }
    digest
}

fn extract_event(json: &serde_json::Value, digest: &mut RunDigest) {
    match json.get("type").and_then(|v| v.as_str()) {
        Some("assistant") => extract_assistant(json, digest),
        Some("result") => extract_result(json, digest),
        _ => {}
    }
}

fn extract_assistant(json: &serde_json::Value, digest: &mut RunDigest) {
    let Some(content) = json
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
    else {
        return;
    };

    for block in content {
        if block.get("type").and_then(|v| v.as_str()) != Some("tool_use") {
            continue;
        }
        let Some(tool_name) = block.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        *digest.tool_counts.entry(tool_name.to_string()).or_insert(0) += 1;

        let input = block.get("input");
        match tool_name {
            "Write" | "Edit" => {
                if let Some(path) = input
                    .and_then(|i| i.get("file_path"))
                    .and_then(|v| v.as_str())
                {
                    digest.files_modified.insert(path.to_string());
                }
            }
            "Bash" => {
                if let Some(command) = input
                    .and_then(|i| i.get("command"))
                    .and_then(|v| v.as_str())
                {
                    if let Some(call) = mutation_call(command) {
                        digest.mutation_commands.push(call);
                    }
                }
            }
            _ => {}
        }
    }
}

fn extract_result(json: &serde_json::Value, digest: &mut RunDigest) {
    digest.result_subtype = json
        .get("subtype")
        .and_then(|v| v.as_str())
        .map(String::from);
    digest.duration_ms = json.get("duration_ms").and_then(|v| v.as_u64());
    digest.num_turns = json.get("num_turns").and_then(|v| v.as_u64());
    digest.cost_usd = json.get("total_cost_usd").and_then(|v| v.as_f64());

    if let Some(result) = json.get("result").and_then(|v| v.as_str()) {
        digest.result_text = Some(result.chars().take(RESULT_TEXT_LIMIT).collect());
    }

    if let Some(usage) = json.get("usage") {
        let get = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
        digest.usage = Some(TokenUsage {
            input_tokens: get("input_tokens"),
            output_tokens: get("output_tokens"),
            cache_creation_input_tokens: get("cache_creation_input_tokens"),
            cache_read_input_tokens: get("cache_read_input_tokens"),
        });
    }
}

/// Detect a state-changing `wk` call in a Bash command.
///
/// Returns the call rendered as `wk <args…>` when the first word is `wk`
/// (or `./wk`) and the subcommand mutates walk state.
fn mutation_call(command: &str) -> Option<String> {
    let trimmed = command.trim();
    let rest = trimmed
        .strip_prefix("./wk ")
        .or_else(|| trimmed.strip_prefix("wk "))?;
    let subcommand = rest.split_whitespace().next()?;
    if !MUTATION_SUBCOMMANDS.contains(&subcommand) {
        return None;
    }
    Some(format!("wk {}", rest.split_whitespace().collect::<Vec<_>>().join(" ")))
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
