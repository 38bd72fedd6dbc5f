// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planning lifecycle: advance the epoch, run the planner, interpret its
//! result file, finalize the walk when it declares the goal met.

use crate::command::planner_invocation;
use crate::digest::digest_stream_log;
use crate::error::RunnerError;
use crate::runner::{spawn_captured, spawn_to_files};
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use wk_core::{Clock, RunRecord, WalkConfig, WalkStatus};
use wk_prompt::{build_planner_prompt, render_summary};
use wk_store::{paths, StoreError, WalkStore};

/// What a planning round concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningOutcome {
    /// The investigation is done; finalize the walk.
    Completed { reason: String },
    /// The planner queued follow-up work.
    CreatedIssues,
    /// Nothing to add this round.
    NoWorkFound,
}

/// Result of one planning round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningRound {
    pub outcome: PlanningOutcome,
    /// Open-issue delta across the round, used to adapt the planning
    /// threshold.
    pub new_issues: usize,
}

/// Frontmatter of `_planning_result.md`.
#[derive(Debug, Deserialize)]
struct PlanningResultFile {
    outcome: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Run one planning round, blocking until the planner exits.
pub fn run_planning_round<C: Clock>(
    store: &WalkStore<C>,
    config: &WalkConfig,
    backend: &Arc<Mutex<()>>,
) -> Result<PlanningRound, RunnerError> {
    let open_before = store.list(wk_core::IssueStatus::Open)?.len();

    let epoch = store.increment_epoch()?;
    tracing::info!(epoch, "planning round starting");

    let snapshot = store.snapshot()?;
    let prompt = build_planner_prompt(&snapshot);

    // Planner artifacts live under planning/<ts>/ in the walk root.
    let started_at = store.now();
    let run_dir = planning_run_dir(store, started_at)?;
    std::fs::write(run_dir.join("prompt"), &prompt)?;

    let invocation = planner_invocation(config, store.root());
    let (exit_code, digest) = if config.capture {
        let (code, stdout, stderr) = spawn_captured(&invocation, &prompt, store.root())?;
        std::fs::write(run_dir.join("output"), stdout)?;
        std::fs::write(run_dir.join("stderr"), stderr)?;
        (code, crate::digest::RunDigest::default())
    } else {
        let code = spawn_to_files(
            &invocation,
            &prompt,
            store.root(),
            &run_dir.join("output"),
            &run_dir.join("stderr"),
        )?;
        (code, digest_stream_log(&run_dir.join("output")))
    };

    let record = RunRecord {
        started_at,
        finished_at: Some(store.now()),
        exit_code,
        cost_usd: digest.cost_usd,
        usage: digest.usage,
    };
    {
        let _backend = backend.lock();
        std::fs::write(
            run_dir.join("meta"),
            serde_json::to_string_pretty(&record)
                .map_err(|e| StoreError::malformed(run_dir.join("meta"), e))?,
        )?;
    }

    if exit_code != Some(0) {
        tracing::warn!(?exit_code, "planner exited abnormally");
    }

    let declared = read_planning_result(store);
    let open_after = store.list(wk_core::IssueStatus::Open)?.len();
    let new_issues = open_after.saturating_sub(open_before);

    let outcome = match declared {
        Some(result) => {
            let reason = result.reason.unwrap_or_default();
            match result.outcome.as_str() {
                "completed" => PlanningOutcome::Completed { reason },
                "created_issues" => PlanningOutcome::CreatedIssues,
                "no_work_found" => PlanningOutcome::NoWorkFound,
                other => {
                    tracing::warn!(
                        outcome = other,
                        "unknown planning outcome; falling back to observation"
                    );
                    observational_outcome(new_issues)
                }
            }
        }
        None => {
            tracing::warn!("planner wrote no result file; falling back to observation");
            observational_outcome(new_issues)
        }
    };

    tracing::info!(epoch, ?outcome, new_issues, "planning round finished");
    Ok(PlanningRound {
        outcome,
        new_issues,
    })
}

/// Finalize the walk and write `summary.md`.
pub fn finalize_walk<C: Clock>(
    store: &WalkStore<C>,
    status: WalkStatus,
    reason: &str,
) -> Result<(), RunnerError> {
    store.finalize(status, reason)?;
    let snapshot = store.snapshot()?;
    std::fs::write(
        store.root().join(paths::SUMMARY_FILE),
        render_summary(&snapshot),
    )?;
    Ok(())
}

/// The observational rule when the planner's declaration is missing or
/// unrecognised: new open issues mean progress.
fn observational_outcome(new_issues: usize) -> PlanningOutcome {
    if new_issues > 0 {
        PlanningOutcome::CreatedIssues
    } else {
        PlanningOutcome::NoWorkFound
    }
}

/// Read and delete `_planning_result.md`.
fn read_planning_result<C: Clock>(store: &WalkStore<C>) -> Option<PlanningResultFile> {
    let path = store.root().join(paths::PLANNING_RESULT_FILE);
    let text = std::fs::read_to_string(&path).ok()?;
    let parsed = wk_store::frontmatter::parse::<PlanningResultFile>(&path, &text);
    if let Err(e) = std::fs::remove_file(&path) {
        tracing::warn!(error = %e, "failed to delete planning result file");
    }
    match parsed {
        Ok((result, _body)) => Some(result),
        Err(e) => {
            tracing::warn!(error = %e, "malformed planning result file");
            None
        }
    }
}

fn planning_run_dir<C: Clock>(
    store: &WalkStore<C>,
    started_at: chrono::DateTime<chrono::Utc>,
) -> Result<PathBuf, RunnerError> {
    let dir = store.root().join(paths::PLANNING_DIR);
    std::fs::create_dir_all(&dir)?;
    let base = started_at.format("%Y%m%d-%H%M%S").to_string();
    let mut candidate = dir.join(&base);
    let mut suffix = 0u32;
    while candidate.exists() {
        suffix += 1;
        candidate = dir.join(format!("{base}-{suffix}"));
    }
    std::fs::create_dir(&candidate)?;
    Ok(candidate)
}

#[cfg(test)]
#[path = "planning_tests.rs"]
mod tests;
