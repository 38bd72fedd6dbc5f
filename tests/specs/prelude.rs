//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for testing wk CLI behavior.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Once;

static BUILD_WK: Once = Once::new();

/// Returns the path to the wk binary.
///
/// `wk` lives in a separate workspace member with no lib target, so Cargo
/// never sets `CARGO_BIN_EXE_wk` for this package's integration tests and
/// never includes it in this package's own build graph. Build it explicitly
/// once per test run and locate it relative to this test binary's path.
fn wk_binary() -> PathBuf {
    BUILD_WK.call_once(|| {
        let status = Command::new(env!("CARGO"))
            .args(["build", "-p", "wk", "--bin", "wk"])
            .status()
            .expect("failed to invoke cargo to build the wk binary");
        assert!(status.success(), "failed to build the wk binary");
    });

    let mut dir = std::env::current_exe()
        .expect("failed to resolve current test executable")
        .parent()
        .expect("test executable has no parent directory")
        .to_path_buf();
    if dir.ends_with("deps") {
        dir.pop();
    }
    dir.push(format!("wk{}", std::env::consts::EXE_SUFFIX));
    dir
}

/// Create a CLI builder for wk commands.
pub fn wk(walk: &Path) -> CliBuilder {
    CliBuilder::new().args(&["--walk", &walk.to_string_lossy()])
}

/// A CLI builder with no walk flag (for `wk init`).
pub fn wk_bare() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    stdin: Option<String>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Provide stdin content
    pub fn stdin(mut self, input: &str) -> Self {
        self.stdin = Some(input.to_string());
        self
    }

    fn run(self) -> Output {
        let mut cmd = Command::new(wk_binary());
        cmd.args(&self.args);
        // Keep the environment of the invoking test out of walk resolution
        cmd.env_remove("WALK_DIR");
        cmd.env_remove("WALK_ISSUE");

        if let Some(input) = self.stdin {
            use std::io::Write;
            cmd.stdin(std::process::Stdio::piped());
            cmd.stdout(std::process::Stdio::piped());
            cmd.stderr(std::process::Stdio::piped());
            let mut child = cmd.spawn().expect("command should spawn");
            child
                .stdin
                .take()
                .expect("stdin piped")
                .write_all(input.as_bytes())
                .expect("stdin write");
            child.wait_with_output().expect("command should run")
        } else {
            cmd.output().expect("command should run")
        }
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.run();
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.run();
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        RunAssert { output }
    }

    /// Run and expect a specific exit code
    pub fn exits(self, code: i32) -> RunAssert {
        let output = self.run();
        assert_eq!(
            output.status.code(),
            Some(code),
            "stdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    /// Get stdout as string
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    /// Get stderr as string
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout contains a substring
    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(needle),
            "stdout missing {needle:?}:\n{stdout}"
        );
        self
    }

    /// Assert stderr contains a substring
    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(needle),
            "stderr missing {needle:?}:\n{stderr}"
        );
        self
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }
}

/// Scaffold a walk whose config is fully under test control.
///
/// `agent_cmd` and `planner_cmd` run via `sh -c` with `WALK_DIR` (and
/// `WALK_ISSUE` for workers) in the environment.
pub fn init_walk(dir: &Path, agent_cmd: &str, planner_cmd: &str) {
    std::fs::create_dir_all(dir.join("open")).unwrap();
    std::fs::create_dir_all(dir.join("closed")).unwrap();
    std::fs::create_dir_all(dir.join("epochs")).unwrap();
    std::fs::write(dir.join(".walk.lock"), "").unwrap();
    std::fs::write(
        dir.join("_walk.md"),
        format!(
            "---\n\
             title: Spec walk\n\
             status: open\n\
             config:\n\
             \x20 sleep_secs: 0\n\
             \x20 agent_cmd: {agent_cmd:?}\n\
             \x20 planner_cmd: {planner_cmd:?}\n\
             ---\n\
             \n\
             Answer the question.\n"
        ),
    )
    .unwrap();
}

/// Worker that writes a `result` file and exits 0.
pub const CLOSING_WORKER: &str = r#"printf 'Done.\n' > "$WALK_DIR/open/$WALK_ISSUE/result""#;

/// Planner that writes a `_planning_result.md` with the given outcome.
pub fn planner_writing(outcome: &str, reason: &str) -> String {
    format!(
        r#"printf -- '---\noutcome: {outcome}\nreason: {reason}\n---\n' > "$WALK_DIR/_planning_result.md""#
    )
}

/// Create an issue through the CLI.
pub fn new_issue(walk: &Path, slug: &str, priority: u32) {
    wk(walk)
        .args(&[
            "new",
            slug,
            "--title",
            &format!("Issue {slug}"),
            "--body",
            "Do the thing.",
            "--priority",
            &priority.to_string(),
        ])
        .passes();
}

/// Run the driver for a bounded number of iterations, expecting exit 0.
pub fn run_driver(walk: &Path, iterations: u64) -> RunAssert {
    wk(walk)
        .args(&["run", "--max-iterations", &iterations.to_string()])
        .passes()
}
