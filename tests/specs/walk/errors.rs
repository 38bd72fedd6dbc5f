//! Error surfaces: duplicate slugs, bad arguments, missing walks.

use crate::prelude::*;

#[test]
fn duplicate_slug_is_refused_across_partitions() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    new_issue(dir.path(), "alpha", 1);

    wk(dir.path())
        .args(&["new", "alpha", "--title", "Again"])
        .fails()
        .stderr_has("already exists");

    wk(dir.path())
        .args(&["close", "alpha", "--reason", "done"])
        .passes();

    // Still refused once closed
    wk(dir.path())
        .args(&["new", "alpha", "--title", "Again"])
        .fails()
        .stderr_has("already exists");
}

#[test]
fn close_requires_an_open_issue() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");

    wk(dir.path())
        .args(&["close", "ghost", "--reason", "x"])
        .fails()
        .stderr_has("not open");
}

#[test]
fn invalid_slugs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");

    wk(dir.path())
        .args(&["new", "Bad_Slug", "--title", "Nope"])
        .fails();
}

#[test]
fn unknown_signal_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");
    new_issue(dir.path(), "alpha", 1);

    wk(dir.path())
        .args(&["close", "alpha", "--reason", "x", "--signal", "meh"])
        .fails()
        .stderr_has("unknown signal");
    // No state change
    assert!(dir.path().join("open/alpha").is_dir());
}

#[test]
fn commands_outside_a_walk_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();

    wk(dir.path())
        .args(&["list"])
        .fails()
        .stderr_has("not a walk directory");
}

#[test]
fn show_unknown_issue_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");

    wk(dir.path())
        .args(&["show", "ghost"])
        .fails()
        .stderr_has("not found");
}
