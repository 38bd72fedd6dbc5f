// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::issues::CreateIssue;
use chrono::{TimeZone, Utc};
use wk_core::{FakeClock, Signal, WalkHeader};

fn store(dir: &Path) -> WalkStore<FakeClock> {
    let clock = FakeClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    WalkStore::scaffold_with_clock(dir, &WalkHeader::new("T"), "goals\n", clock).unwrap()
}

fn slug(s: &str) -> Slug {
    Slug::parse(s).unwrap()
}

#[test]
fn no_current_epoch_in_fresh_walk() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    assert_eq!(store.current_epoch(), None);
}

#[test]
fn first_closure_bootstraps_epoch_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.create(CreateIssue::new(slug("alpha"), "A")).unwrap();
    let closure = store.close_issue(&slug("alpha"), "x", Signal::Routine).unwrap();
    assert_eq!(closure.epoch, 1);
    assert_eq!(store.current_epoch(), Some(1));
}

#[test]
fn increment_is_strictly_increasing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let a = store.increment_epoch().unwrap();
    let b = store.increment_epoch().unwrap();
    let c = store.increment_epoch().unwrap();
    assert_eq!((a, b, c), (1, 2, 3));
    assert_eq!(store.current_epoch(), Some(3));
}

#[test]
fn closures_land_in_the_current_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.create(CreateIssue::new(slug("early"), "E")).unwrap();
    store.create(CreateIssue::new(slug("late"), "L")).unwrap();

    store.close_issue(&slug("early"), "x", Signal::Routine).unwrap();
    store.increment_epoch().unwrap();
    store.close_issue(&slug("late"), "x", Signal::Routine).unwrap();

    let epochs = store.epochs();
    assert_eq!(epochs.get(&1).map(Vec::as_slice), Some(&[slug("early")][..]));
    assert_eq!(epochs.get(&2).map(Vec::as_slice), Some(&[slug("late")][..]));
}

#[test]
fn record_closure_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.create(CreateIssue::new(slug("alpha"), "A")).unwrap();
    store.close_issue(&slug("alpha"), "x", Signal::Routine).unwrap();

    store.record_closure_in_epoch(&slug("alpha"), 1).unwrap();
    store.record_closure_in_epoch(&slug("alpha"), 1).unwrap();

    let epochs = store.epochs();
    assert_eq!(epochs.get(&1).map(|v| v.len()), Some(1));
}

#[test]
fn empty_epochs_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.increment_epoch().unwrap();
    store.increment_epoch().unwrap();
    let epochs = store.epochs();
    assert_eq!(epochs.len(), 2);
    assert!(epochs.values().all(Vec::is_empty));
}

#[test]
fn current_link_survives_tampered_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.increment_epoch().unwrap();
    // A stray higher-numbered directory forces the next epoch past it
    std::fs::create_dir_all(store.epochs_dir().join("7")).unwrap();
    let next = store.increment_epoch().unwrap();
    assert_eq!(next, 8);
}
