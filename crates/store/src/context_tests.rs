// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::issues::CreateIssue;
use chrono::{Duration, TimeZone};
use wk_core::{FakeClock, WalkHeader};

fn store(dir: &Path) -> WalkStore<FakeClock> {
    let clock = FakeClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    WalkStore::scaffold_with_clock(dir, &WalkHeader::new("T"), "goals\n", clock).unwrap()
}

fn slug(s: &str) -> Slug {
    Slug::parse(s).unwrap()
}

/// Create and close an issue whose result file has exactly `result_bytes`.
fn close_with_bytes(
    store: &WalkStore<FakeClock>,
    name: &str,
    body: &str,
    result_bytes: usize,
    signal: Signal,
) {
    let mut req = CreateIssue::new(slug(name), format!("Issue {name}"));
    req.body = body.to_string();
    store.create(req).unwrap();
    std::fs::write(
        store.open_issue_dir(name).join(paths::RESULT_FILE),
        "r".repeat(result_bytes),
    )
    .unwrap();
    store.close_issue(&slug(name), "done", signal).unwrap();
}

#[test]
fn new_context_since_counts_closures_after_the_mark() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    close_with_bytes(&store, "before", "b", 100, Signal::Routine);
    let mark = store.now();
    store.clock().advance(Duration::seconds(10));
    close_with_bytes(&store, "after-one", "b", 200, Signal::Surprising);
    store.clock().advance(Duration::seconds(10));
    close_with_bytes(&store, "after-two", "b", 50, Signal::Pivotal);

    let context = store.new_context_since(mark);
    assert_eq!(context.bytes, 250);
    assert_eq!(context.issues, vec![slug("after-one"), slug("after-two")]);
    assert!(context.has_surprising());
    assert!(context.has_pivotal());
}

#[test]
fn new_context_since_now_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    close_with_bytes(&store, "alpha", "b", 100, Signal::Pivotal);

    let context = store.new_context_since(store.now());
    assert_eq!(context.bytes, 0);
    assert!(context.signals.is_empty());
    assert!(context.issues.is_empty());
}

#[test]
fn routine_signals_are_not_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let mark = store.now() - Duration::seconds(1);
    close_with_bytes(&store, "alpha", "b", 10, Signal::Routine);

    let context = store.new_context_since(mark);
    assert_eq!(context.issues.len(), 1);
    assert!(context.signals.is_empty());
}

#[test]
fn comment_bytes_count_toward_new_context() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let mark = store.now() - Duration::seconds(1);
    close_with_bytes(&store, "alpha", "b", 10, Signal::Routine);
    store.add_comment(&slug("alpha"), "a postmortem note").unwrap();

    let context = store.new_context_since(mark);
    let comments_len = store.read_comments(&slug("alpha")).unwrap().len() as u64;
    assert_eq!(context.bytes, 10 + comments_len);
}

#[test]
fn recent_closed_stops_at_the_byte_budget() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    for (i, name) in ["one", "two", "three"].iter().enumerate() {
        close_with_bytes(&store, name, "bb", 1000, Signal::Routine);
        let _ = i;
        store.clock().advance(Duration::seconds(10));
    }

    // Each issue is ~1002 bytes; a 1500-byte budget takes the newest two.
    let groups = store.recent_closed(1500);
    let slugs: Vec<String> = groups
        .iter()
        .flat_map(|g| g.issues.iter().map(|i| i.slug.to_string()))
        .collect();
    assert_eq!(slugs, vec!["three", "two"]);
}

#[test]
fn recent_closed_groups_by_epoch_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    close_with_bytes(&store, "old", "b", 10, Signal::Routine);
    store.clock().advance(Duration::seconds(10));
    store.increment_epoch().unwrap();
    close_with_bytes(&store, "mid", "b", 10, Signal::Routine);
    store.clock().advance(Duration::seconds(10));
    close_with_bytes(&store, "new", "b", 10, Signal::Surprising);

    let groups = store.recent_closed(u64::MAX);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].epoch, 2);
    let epoch2: Vec<String> = groups[0].issues.iter().map(|i| i.slug.to_string()).collect();
    assert_eq!(epoch2, vec!["new", "mid"]);
    assert_eq!(groups[1].epoch, 1);
    assert_eq!(groups[1].issues[0].slug, "old");
}

#[test]
fn recent_closed_records_parents() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    close_with_bytes(&store, "parent", "b", 10, Signal::Routine);
    let mut req = CreateIssue::new(slug("child"), "Child");
    req.body = "b".to_string();
    req.derived_from.insert(slug("parent"));
    store.create(req).unwrap();
    store.close_issue(&slug("child"), "x", Signal::Routine).unwrap();

    let groups = store.recent_closed(u64::MAX);
    let child = groups
        .iter()
        .flat_map(|g| &g.issues)
        .find(|i| i.slug == "child")
        .unwrap();
    assert_eq!(child.parents, vec![slug("parent")]);
}

#[test]
fn expansion_stats_per_type_and_overall() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    // probe: ratios 2.0 and 4.0 over 100-byte bodies
    close_with_bytes(&store, "probe-a", &"b".repeat(100), 200, Signal::Routine);
    close_with_bytes(&store, "probe-b", &"b".repeat(100), 400, Signal::Routine);
    // fix: ratio 1.0
    close_with_bytes(&store, "fix-a", &"b".repeat(100), 100, Signal::Routine);

    let stats = store.expansion_stats();
    let overall = stats.overall.unwrap();
    assert_eq!(overall.count, 3);
    assert_eq!(overall.median, 2.0);
    assert_eq!(overall.p75, 4.0);
    assert_eq!(overall.total_body_bytes, 300);
    assert_eq!(overall.total_closed_bytes, 700);

    let probe = stats.by_type.get("probe").unwrap();
    assert_eq!(probe.count, 2);
    assert_eq!(probe.median, 3.0);

    let fix = stats.by_type.get("fix").unwrap();
    assert_eq!(fix.count, 1);
    assert_eq!(fix.median, 1.0);
    assert_eq!(fix.p75, 1.0);
}

#[test]
fn zero_byte_bodies_are_excluded_from_stats() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    close_with_bytes(&store, "empty-body", "", 500, Signal::Routine);

    let stats = store.expansion_stats();
    assert!(stats.overall.is_none());
    assert!(stats.by_type.is_empty());
}

#[test]
fn open_issues_never_appear_in_context_scans() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let mut req = CreateIssue::new(slug("open-one"), "Open");
    req.body = "body".to_string();
    store.create(req).unwrap();

    assert!(store.recent_closed(u64::MAX).is_empty());
    assert_eq!(store.new_context_since(store.now() - Duration::days(1)).bytes, 0);
    assert!(store.expansion_stats().overall.is_none());
}
