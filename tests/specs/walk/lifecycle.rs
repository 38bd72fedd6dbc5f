//! Issue lifecycle through the CLI: create, list, show, comment, close.

use crate::prelude::*;

#[test]
fn new_list_show_close_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");

    new_issue(dir.path(), "probe-cache", 2);

    wk(dir.path())
        .args(&["list"])
        .passes()
        .stdout_eq("probe-cache [p2]: Issue probe-cache\n");

    wk(dir.path())
        .args(&["show", "probe-cache"])
        .passes()
        .stdout_has("probe-cache — open")
        .stdout_has("Do the thing.");

    wk(dir.path())
        .args(&["close", "probe-cache", "--reason", "All answered"])
        .passes()
        .stdout_has("closed probe-cache (epoch 1)");

    assert!(dir.path().join("closed/probe-cache").is_dir());
    assert!(!dir.path().join("open/probe-cache").exists());

    wk(dir.path())
        .args(&["list", "--status", "closed"])
        .passes()
        .stdout_has("probe-cache");
}

#[test]
fn comments_accumulate_in_sections() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    new_issue(dir.path(), "alpha", 1);

    wk(dir.path()).args(&["comment", "alpha", "first note"]).passes();
    wk(dir.path()).args(&["comment", "alpha", "second note"]).passes();

    let comments = std::fs::read_to_string(dir.path().join("open/alpha/comments.md")).unwrap();
    let first = comments.find("first note").unwrap();
    let second = comments.find("second note").unwrap();
    assert!(first < second);
    assert_eq!(comments.matches("## ").count(), 2);
}

#[test]
fn blocked_issues_record_their_dependency() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    new_issue(dir.path(), "dep", 1);

    wk(dir.path())
        .args(&["new", "gated", "--title", "Gated", "--blocked-by", "dep"])
        .passes();

    wk(dir.path())
        .args(&["show", "gated"])
        .passes()
        .stdout_has("blocked by: dep");

    wk(dir.path())
        .args(&["close", "dep", "--reason", "done"])
        .passes();

    // The dependency is closed; gated remains open and now unblocked
    assert!(dir.path().join("open/gated").is_dir());
}

#[test]
fn bump_marks_the_next_issue() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    new_issue(dir.path(), "alpha", 5);

    wk(dir.path()).args(&["bump", "alpha"]).passes();
    assert!(dir.path().join("open/alpha/.next").is_file());

    wk(dir.path()).args(&["list"]).passes().stdout_has("*next*");
}

#[test]
fn status_and_history_render() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    new_issue(dir.path(), "alpha", 1);
    wk(dir.path())
        .args(&["close", "alpha", "--reason", "ok", "--signal", "surprising"])
        .passes();

    wk(dir.path())
        .args(&["status"])
        .passes()
        .stdout_has("Spec walk — open")
        .stdout_has("0 open · 1 closed");

    wk(dir.path())
        .args(&["history"])
        .passes()
        .stdout_has("## Epoch 1")
        .stdout_has("alpha [surprising]: ok");
}

#[test]
fn unblock_removes_the_driver_marker() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    new_issue(dir.path(), "stuck", 1);
    std::fs::write(dir.path().join("open/stuck/blocked_by_driver"), "why\n").unwrap();

    wk(dir.path()).args(&["unblock", "stuck"]).passes();
    assert!(!dir.path().join("open/stuck/blocked_by_driver").exists());
}

#[test]
fn init_scaffolds_a_walk() {
    let dir = tempfile::tempdir().unwrap();
    let walk = dir.path().join("investigation");

    wk_bare()
        .args(&["init", &walk.to_string_lossy(), "--title", "Fresh walk"])
        .stdin("Figure out the thing.\n")
        .passes()
        .stdout_has("initialized walk");

    assert!(walk.join("_walk.md").is_file());
    assert!(walk.join("open").is_dir());
    assert!(walk.join("closed").is_dir());
    assert!(walk.join("epochs").is_dir());

    let header = std::fs::read_to_string(walk.join("_walk.md")).unwrap();
    assert!(header.contains("title: Fresh walk"));
    assert!(header.contains("Figure out the thing."));
}
