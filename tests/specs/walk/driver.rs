//! Driver end-to-end scenarios with mock workers and planners.

use crate::prelude::*;

#[test]
fn single_issue_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), CLOSING_WORKER, "true");
    new_issue(dir.path(), "alpha", 1);

    run_driver(dir.path(), 1);

    assert!(dir.path().join("closed/alpha").is_dir());
    assert!(!dir.path().join("open/alpha").exists());

    let result = std::fs::read_to_string(dir.path().join("closed/alpha/result")).unwrap();
    assert_eq!(result, "Done.\n");

    let runs: Vec<_> = std::fs::read_dir(dir.path().join("closed/alpha/runs"))
        .unwrap()
        .collect();
    assert_eq!(runs.len(), 1);

    let meta: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(
            runs[0].as_ref().unwrap().path().join("meta"),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(meta["exit_code"], 0);

    let comments =
        std::fs::read_to_string(dir.path().join("closed/alpha/comments.md")).unwrap();
    assert!(comments.contains("Agent started"));
    assert!(comments.contains("Run stats:"));
}

#[test]
fn priority_selection_runs_the_highest_first() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), CLOSING_WORKER, "true");
    new_issue(dir.path(), "hi", 1);
    new_issue(dir.path(), "lo", 3);

    run_driver(dir.path(), 1);

    assert!(dir.path().join("closed/hi").is_dir());
    assert!(dir.path().join("open/lo").is_dir());
}

#[test]
fn retry_exhaustion_blocks_the_issue() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "exit 1", "true");
    new_issue(dir.path(), "buggy", 1);
    // Two prior failures on record
    for (i, ts) in ["20260301-080000", "20260301-080100"].iter().enumerate() {
        let run_dir = dir.path().join("open/buggy/runs").join(ts);
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(
            run_dir.join("meta"),
            format!(
                "{{\"started_at\":\"2026-03-01T08:0{i}:00Z\",\"exit_code\":1}}"
            ),
        )
        .unwrap();
    }

    run_driver(dir.path(), 1);

    assert!(dir.path().join("open/buggy/blocked_by_driver").is_file());
    let comments = std::fs::read_to_string(dir.path().join("open/buggy/comments.md")).unwrap();
    assert!(comments.contains("consecutive failures"));

    // The blocked issue never reaches the ready queue again: another
    // iteration spawns nothing (runs count stays at 3).
    run_driver(dir.path(), 1);
    let runs = std::fs::read_dir(dir.path().join("open/buggy/runs")).unwrap().count();
    assert_eq!(runs, 3);
}

#[test]
fn planner_completes_the_walk() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", &planner_writing("completed", "Goal met"));

    run_driver(dir.path(), 5);

    let header = std::fs::read_to_string(dir.path().join("_walk.md")).unwrap();
    assert!(header.contains("status: completed"));
    assert!(header.contains("finish_reason: Goal met"));
    assert!(dir.path().join("summary.md").is_file());
    assert!(!dir.path().join("_planning_result.md").exists());
}

#[test]
fn planner_stall_after_repeated_empty_rounds() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", &planner_writing("no_work_found", "dry"));

    run_driver(dir.path(), 10);

    let header = std::fs::read_to_string(dir.path().join("_walk.md")).unwrap();
    assert!(header.contains("status: stalled"));
    assert!(header.contains("planning rounds"));
}

#[test]
fn restart_marker_exits_42() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    std::fs::write(dir.path().join("_restart_requested"), "").unwrap();

    wk(dir.path())
        .args(&["run", "--max-iterations", "5"])
        .exits(42);

    assert!(!dir.path().join("_restart_requested").exists());
    // The walk stays open for the restarted driver
    let header = std::fs::read_to_string(dir.path().join("_walk.md")).unwrap();
    assert!(header.contains("status: open"));
}

#[test]
fn worker_created_issues_are_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    // First worker closes its issue and queues a follow-up through the CLI
    let wk_bin = assert_cmd::cargo::cargo_bin("wk");
    let agent_cmd = format!(
        r#"if [ "$WALK_ISSUE" = "seed" ]; then {wk} new follow-up --title Follow --derived-from seed; fi; printf 'ok\n' > "$WALK_DIR/open/$WALK_ISSUE/result""#,
        wk = wk_bin.to_string_lossy()
    );
    init_walk(dir.path(), &agent_cmd, "true");
    new_issue(dir.path(), "seed", 1);

    run_driver(dir.path(), 2);

    assert!(dir.path().join("closed/seed").is_dir());
    assert!(dir.path().join("closed/follow-up").is_dir());
    // Provenance recorded through the discovery link
    assert!(dir
        .path()
        .join("closed/follow-up/derived_from/seed")
        .symlink_metadata()
        .is_ok());
}

#[test]
fn two_drivers_cannot_share_a_walk() {
    let dir = tempfile::tempdir().unwrap();
    // Worker sleeps long enough for the second driver to collide
    init_walk(
        dir.path(),
        &format!("sleep 1; {CLOSING_WORKER}"),
        "true",
    );
    new_issue(dir.path(), "slow", 1);

    let walk = dir.path().to_path_buf();
    let racer = std::thread::spawn(move || {
        wk(&walk).args(&["run", "--max-iterations", "1"]).passes();
    });
    // Give the first driver time to take the PID file
    std::thread::sleep(std::time::Duration::from_millis(300));

    wk(dir.path())
        .args(&["run", "--max-iterations", "1"])
        .fails()
        .stderr_has("another driver is live");

    racer.join().unwrap();
}
