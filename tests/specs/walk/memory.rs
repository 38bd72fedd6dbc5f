//! Memory proposal lifecycle through the CLI.

use crate::prelude::*;

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn propose_accept_forget_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");

    wk(dir.path())
        .args(&["propose", "cache-keys", "Keys are sha256 of the URL"])
        .passes();

    let proposals = read_json(&dir.path().join("proposals.json"));
    assert_eq!(proposals[0]["key"], "cache-keys");

    wk(dir.path()).args(&["accept", "cache-keys"]).passes();

    let proposals = read_json(&dir.path().join("proposals.json"));
    assert_eq!(proposals.as_array().unwrap().len(), 0);
    let memories = read_json(&dir.path().join("memories.json"));
    assert_eq!(memories[0]["key"], "cache-keys");
    assert_eq!(memories[0]["alive_from"], 1);
    assert!(memories[0]["alive_until"].is_null() || memories[0].get("alive_until").is_none());

    wk(dir.path()).args(&["forget", "cache-keys"]).passes();
    let memories = read_json(&dir.path().join("memories.json"));
    assert_eq!(memories[0]["alive_until"], 1);
}

#[test]
fn discard_drops_a_proposal() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");

    wk(dir.path()).args(&["propose", "bad-idea", "not true"]).passes();
    wk(dir.path()).args(&["discard", "bad-idea"]).passes();

    let proposals = read_json(&dir.path().join("proposals.json"));
    assert_eq!(proposals.as_array().unwrap().len(), 0);
    assert!(!dir.path().join("memories.json").exists());
}

#[test]
fn forget_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    init_walk(dir.path(), "true", "true");

    wk(dir.path())
        .args(&["forget", "ghost"])
        .fails()
        .stderr_has("memory not found");
}
