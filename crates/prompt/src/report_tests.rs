// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone, Utc};
use wk_core::{FakeClock, Signal, Slug, WalkHeader, WalkStatus};
use wk_store::{CreateIssue, WalkStore};

fn store(dir: &std::path::Path) -> WalkStore<FakeClock> {
    let clock = FakeClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    WalkStore::scaffold_with_clock(dir, &WalkHeader::new("Cache latency"), "goals\n", clock)
        .unwrap()
}

fn slug(s: &str) -> Slug {
    Slug::parse(s).unwrap()
}

#[test]
fn summary_includes_status_totals_and_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.create(CreateIssue::new(slug("done"), "Done issue")).unwrap();
    store.create(CreateIssue::new(slug("still-open"), "Open issue")).unwrap();
    store.close_issue(&slug("done"), "Found it", Signal::Pivotal).unwrap();
    store.clock().advance(Duration::seconds(10));
    store.finalize(WalkStatus::Completed, "Goal met").unwrap();

    let summary = render_summary(&store.snapshot().unwrap());
    assert!(summary.contains("# Summary: Cache latency"));
    assert!(summary.contains("Status: completed"));
    assert!(summary.contains("Reason: Goal met"));
    assert!(summary.contains("Finished: 2026-03-01T09:00:10Z"));
    assert!(summary.contains("1 closed, 1 open"));
    assert!(summary.contains("## Timeline"));
    assert!(summary.contains("done [pivotal]: Found it"));
    assert!(summary.contains("## Left open"));
    assert!(summary.contains("- still-open [p1]: Open issue"));
}

#[test]
fn summary_omits_empty_sections() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let summary = render_summary(&store.snapshot().unwrap());
    assert!(!summary.contains("## Timeline"));
    assert!(!summary.contains("## Left open"));
}

#[test]
fn status_counts_partitions_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.create(CreateIssue::new(slug("a"), "A")).unwrap();
    store.create(CreateIssue::new(slug("b"), "B")).unwrap();
    store.block_by_driver(&slug("b"), "marker\n").unwrap();
    store.create(CreateIssue::new(slug("c"), "C")).unwrap();
    store.close_issue(&slug("c"), "x", Signal::Routine).unwrap();

    let status = render_status(&store.snapshot().unwrap());
    assert!(status.contains("Cache latency — open"));
    assert!(status.contains("epoch 1 · 2 open · 1 closed"));
    assert!(status.contains("1 driver-blocked"));
    assert!(status.contains("b [p1] *blocked*: B"));
}

#[test]
fn history_groups_by_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.create(CreateIssue::new(slug("first"), "F")).unwrap();
    store.close_issue(&slug("first"), "early result", Signal::Routine).unwrap();
    store.increment_epoch().unwrap();
    store.create(CreateIssue::new(slug("second"), "S")).unwrap();
    store
        .close_issue(&slug("second"), "late result", Signal::Surprising)
        .unwrap();

    let history = render_history(&store.snapshot().unwrap());
    let epoch1 = history.find("## Epoch 1").unwrap();
    let epoch2 = history.find("## Epoch 2").unwrap();
    assert!(epoch1 < epoch2);
    assert!(history.contains("- first: early result"));
    assert!(history.contains("- second [surprising]: late result"));
}

#[test]
fn history_shows_empty_epochs() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.increment_epoch().unwrap();
    let history = render_history(&store.snapshot().unwrap());
    assert!(history.contains("## Epoch 1"));
    assert!(history.contains("(no closures)"));
}

#[test]
fn empty_walk_history_says_so() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    assert_eq!(render_history(&store.snapshot().unwrap()), "No epochs yet.\n");
}
