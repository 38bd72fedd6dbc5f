// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One worker invocation against one issue.
//!
//! The runner gates on the retry policy, assembles the prompt, spawns the
//! configured command with the prompt on stdin, waits, records run
//! artifacts, and detects whether the worker closed its issue.

use crate::command::{worker_invocation, Invocation};
use crate::digest::{digest_stream_log, RunDigest};
use crate::error::RunnerError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use wk_core::{
    consecutive_failures, format_elapsed_ms, should_block, should_warn, Clock, Issue, RunRecord,
    Signal, Slug, SystemClock, WalkConfig,
};
use wk_prompt::{build_worker_prompt, WorkerPromptInput};
use wk_store::{paths, StoreError, WalkStore};

/// How one invocation left the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The retry gate fired; no worker was spawned.
    Blocked,
    /// The issue ended the invocation closed.
    Closed,
    /// The worker exited without closing the issue.
    StillOpen,
}

/// Worker-written close file: a richer alternative to the bare `result`
/// file.
#[derive(Debug, Deserialize)]
struct WorkerClose {
    #[allow(dead_code)]
    #[serde(default)]
    status: Option<String>,
    reason: String,
    #[serde(default)]
    signal: Option<String>,
}

/// Runs workers against issues.
///
/// Cheap to clone; concurrent drivers hand one clone to each worker
/// thread. All store mutations go through the shared backend mutex so
/// comment ordering is preserved under concurrency.
#[derive(Clone)]
pub struct AgentRunner<C: Clock = SystemClock> {
    store: WalkStore<C>,
    config: WalkConfig,
    backend: Arc<Mutex<()>>,
}

impl<C: Clock> AgentRunner<C> {
    pub fn new(store: WalkStore<C>, config: WalkConfig, backend: Arc<Mutex<()>>) -> Self {
        Self {
            store,
            config,
            backend,
        }
    }

    pub fn store(&self) -> &WalkStore<C> {
        &self.store
    }

    /// Run one worker invocation against `slug`, blocking until the child
    /// exits.
    pub fn run_issue(&self, slug: &Slug) -> Result<RunOutcome, RunnerError> {
        let issue = self.store.show(slug)?;
        if issue.status == wk_core::IssueStatus::Closed {
            // Lost a race with a concurrent close; nothing to do.
            return Ok(RunOutcome::Closed);
        }

        // 1. Retry gate
        let failures = consecutive_failures(&issue.runs);
        if should_block(failures, self.config.max_failures) {
            self.block_issue(slug, &issue, failures)?;
            return Ok(RunOutcome::Blocked);
        }
        if should_warn(failures, self.config.max_failures) {
            let _backend = self.backend.lock();
            self.store.add_comment(
                slug,
                &format!(
                    "Warning: {failures} consecutive failures; one more failure blocks this issue."
                ),
            )?;
        }

        // 2. Prompt
        let (header, goals) = self.store.load_walk()?;
        let context = self.store.context_file();
        let issue_type = issue.issue_type();
        let prompt = build_worker_prompt(&WorkerPromptInput {
            walk_root: self.store.root(),
            context: context.as_deref(),
            walk_title: &header.title,
            goals: &goals,
            issue: &issue,
            self_protocol: self.config.self_types.iter().any(|t| *t == issue_type),
        });

        // 3. Start comment
        {
            let _backend = self.backend.lock();
            self.store.add_comment(
                slug,
                &format!(
                    "Agent started (type {issue_type}, prompt {} lines).",
                    prompt.lines().count()
                ),
            )?;
        }

        // 4. Run directory
        let started_at = self.store.now();
        let run_dir = create_run_dir(
            &self.store.open_issue_dir(slug.as_str()).join(paths::RUNS_DIR),
            started_at,
        )?;
        std::fs::write(run_dir.join("prompt"), &prompt)?;
        let run_name: PathBuf = run_dir
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("run"));

        tracing::info!(slug = %slug, run = %run_name.display(), "worker starting");

        // 5. Live-log symlink (stream mode), removed when this scope ends
        let _live_link = if self.config.capture {
            None
        } else {
            LiveLink::create(self.store.root(), slug, &run_dir.join("output"))
        };

        // 6–7. Spawn and wait
        let invocation = worker_invocation(&self.config, self.store.root(), &issue);
        let (exit_code, captured) = if self.config.capture {
            let (code, stdout, stderr) =
                spawn_captured(&invocation, &prompt, self.store.root())?;
            (code, Some((stdout, stderr)))
        } else {
            let code = spawn_to_files(
                &invocation,
                &prompt,
                self.store.root(),
                &run_dir.join("output"),
                &run_dir.join("stderr"),
            )?;
            (code, None)
        };
        let finished_at = self.store.now();

        // Relocation: the worker may have closed the issue mid-run, moving
        // the whole directory (runs included) to closed/.
        let final_run_dir = if run_dir.is_dir() {
            run_dir
        } else {
            self.store
                .closed_issue_dir(slug.as_str())
                .join(paths::RUNS_DIR)
                .join(&run_name)
        };
        std::fs::create_dir_all(&final_run_dir)?;

        // 8–9. Digest and artifacts
        let digest = if self.config.capture {
            if let Some((stdout, stderr)) = &captured {
                std::fs::write(final_run_dir.join("output"), stdout)?;
                std::fs::write(final_run_dir.join("stderr"), stderr)?;
            }
            RunDigest::default()
        } else {
            digest_stream_log(&final_run_dir.join("output"))
        };

        let record = RunRecord {
            started_at,
            finished_at: Some(finished_at),
            exit_code,
            cost_usd: digest.cost_usd,
            usage: digest.usage,
        };
        {
            let _backend = self.backend.lock();
            std::fs::write(
                final_run_dir.join("meta"),
                serde_json::to_string_pretty(&record)
                    .map_err(|e| StoreError::malformed(final_run_dir.join("meta"), e))?,
            )?;
            self.store
                .add_comment(slug, &run_stats_comment(&record, &digest))?;
        }

        if exit_code.is_none() {
            tracing::warn!(slug = %slug, "worker interrupted by signal");
        } else if exit_code != Some(0) {
            tracing::warn!(slug = %slug, exit_code = exit_code.unwrap_or(-1), "worker failed");
        }

        // 10. Close detection
        let outcome = self.detect_close(slug, exit_code, captured.as_ref())?;

        // A failed run may have exhausted the retry budget; block now so the
        // issue never re-enters the ready queue.
        if outcome == RunOutcome::StillOpen && matches!(exit_code, Some(code) if code != 0) {
            let refreshed = self.store.show(slug)?;
            let failures = consecutive_failures(&refreshed.runs);
            if should_block(failures, self.config.max_failures) {
                self.block_issue(slug, &refreshed, failures)?;
            }
        }
        Ok(outcome)
    }

    fn block_issue(&self, slug: &Slug, issue: &Issue, failures: u32) -> Result<(), RunnerError> {
        let mut marker = format!("Blocked after {failures} consecutive failures.\n\nFailing runs:\n");
        for run in issue.runs.iter().rev().take(failures as usize) {
            marker.push_str(&format!(
                "- {} (exit {})\n",
                run.started_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                run.exit_code.map_or("?".to_string(), |c| c.to_string())
            ));
        }
        marker.push_str("\nDelete this file to make the issue eligible again.\n");

        let _backend = self.backend.lock();
        self.store.block_by_driver(slug, &marker)?;
        self.store.add_comment(
            slug,
            &format!(
                "Blocked by the driver after {failures} consecutive failures. \
                 Delete `{}` to retry.",
                paths::BLOCKED_MARKER
            ),
        )?;
        Ok(())
    }

    fn detect_close(
        &self,
        slug: &Slug,
        exit_code: Option<i32>,
        captured: Option<&(String, String)>,
    ) -> Result<RunOutcome, RunnerError> {
        // (a) The worker closed through the CLI: the directory moved.
        let after = self.store.show(slug)?;
        if after.status == wk_core::IssueStatus::Closed {
            return Ok(RunOutcome::Closed);
        }

        let open_dir = self.store.open_issue_dir(slug.as_str());

        // (b) Rich close file.
        let close_meta = open_dir.join(paths::CLOSE_META_FILE);
        if close_meta.is_file() {
            let text = std::fs::read_to_string(&close_meta)?;
            match wk_store::frontmatter::parse::<WorkerClose>(&close_meta, &text) {
                Ok((close, _)) => {
                    let signal = close
                        .signal
                        .as_deref()
                        .and_then(Signal::parse)
                        .unwrap_or_default();
                    let _backend = self.backend.lock();
                    self.store.close_issue(slug, &close.reason, signal)?;
                    return Ok(RunOutcome::Closed);
                }
                Err(e) => {
                    tracing::warn!(slug = %slug, error = %e, "unreadable worker close file");
                }
            }
        }

        // (c) Bare result file: first line is the reason.
        let result_path = open_dir.join(paths::RESULT_FILE);
        if result_path.is_file() {
            let text = std::fs::read_to_string(&result_path)?;
            let reason = text.lines().next().unwrap_or("").trim().to_string();
            if !reason.is_empty() {
                let _backend = self.backend.lock();
                self.store.close_issue(slug, &reason, Signal::Routine)?;
                return Ok(RunOutcome::Closed);
            }
        }

        // (d) Still open.
        if let Some((stdout, stderr)) = captured {
            let _backend = self.backend.lock();
            self.store.add_comment(
                slug,
                &format!(
                    "Worker exited (code {}) without closing the issue.\n\nstdout:\n{}\n\nstderr:\n{}",
                    exit_code.map_or("signal".to_string(), |c| c.to_string()),
                    excerpt(stdout),
                    excerpt(stderr)
                ),
            )?;
        }
        Ok(RunOutcome::StillOpen)
    }
}

/// Create `runs/<ts>/`, suffixing `-1`, `-2`, … on collision.
fn create_run_dir(runs_dir: &Path, started_at: DateTime<Utc>) -> Result<PathBuf, RunnerError> {
    std::fs::create_dir_all(runs_dir)?;
    let base = started_at.format("%Y%m%d-%H%M%S").to_string();
    let mut candidate = runs_dir.join(&base);
    let mut suffix = 0u32;
    while candidate.exists() {
        suffix += 1;
        candidate = runs_dir.join(format!("{base}-{suffix}"));
    }
    std::fs::create_dir(&candidate)?;
    Ok(candidate)
}

/// Walk-root `runs/<slug>` symlink pointing at the live stream log.
struct LiveLink {
    path: PathBuf,
}

impl LiveLink {
    fn create(walk_root: &Path, slug: &Slug, log_path: &Path) -> Option<Self> {
        let dir = walk_root.join(paths::LIVE_RUNS_DIR);
        std::fs::create_dir_all(&dir).ok()?;
        let path = dir.join(slug.as_str());
        let _ = std::fs::remove_file(&path);
        std::os::unix::fs::symlink(log_path, &path).ok()?;
        Some(Self { path })
    }
}

impl Drop for LiveLink {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Spawn `sh -c <command>` with the prompt on stdin and stdout/stderr
/// redirected to files. Returns the exit code (None = signal-terminated).
pub(crate) fn spawn_to_files(
    invocation: &Invocation,
    prompt: &str,
    cwd: &Path,
    out_path: &Path,
    err_path: &Path,
) -> Result<Option<i32>, RunnerError> {
    let out_file = std::fs::File::create(out_path)?;
    let err_file = std::fs::File::create(err_path)?;

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&invocation.command)
        .current_dir(cwd)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(out_file)
        .stderr(err_file)
        .spawn()
        .map_err(RunnerError::Spawn)?;

    let writer = stdin_writer(&mut child, prompt);
    let status = child.wait()?;
    if let Some(handle) = writer {
        let _ = handle.join();
    }
    Ok(status.code())
}

/// Spawn with stdout/stderr captured to strings (capture mode).
pub(crate) fn spawn_captured(
    invocation: &Invocation,
    prompt: &str,
    cwd: &Path,
) -> Result<(Option<i32>, String, String), RunnerError> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&invocation.command)
        .current_dir(cwd)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(RunnerError::Spawn)?;

    let writer = stdin_writer(&mut child, prompt);
    let output = child.wait_with_output()?;
    if let Some(handle) = writer {
        let _ = handle.join();
    }
    Ok((
        output.status.code(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

/// Feed the prompt to the child from a separate thread.
///
/// In capture mode stdout is a pipe; writing a large prompt from the
/// waiting thread could deadlock against a child that writes output before
/// reading all of its input.
fn stdin_writer(
    child: &mut std::process::Child,
    prompt: &str,
) -> Option<std::thread::JoinHandle<()>> {
    let mut stdin = child.stdin.take()?;
    let prompt = prompt.to_string();
    Some(std::thread::spawn(move || {
        let _ = stdin.write_all(prompt.as_bytes());
    }))
}

fn run_stats_comment(record: &RunRecord, digest: &RunDigest) -> String {
    let duration_ms = digest.duration_ms.unwrap_or_else(|| {
        record
            .finished_at
            .map(|finished| (finished - record.started_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    });
    let mut comment = format!(
        "Run stats: {}, {} turns, {} tool calls, status {}",
        format_elapsed_ms(duration_ms),
        digest.num_turns.unwrap_or(0),
        digest.total_tool_calls(),
        digest.status(record.exit_code)
    );
    if let Some(cost) = record.cost_usd {
        comment.push_str(&format!(", cost ${cost:.2}"));
    }
    comment.push('.');
    comment
}

fn excerpt(text: &str) -> &str {
    const LIMIT: usize = 1000;
    if text.len() <= LIMIT {
        text
    } else {
        // Truncate on a char boundary
        let mut end = LIMIT;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
