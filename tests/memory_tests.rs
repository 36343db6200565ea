//! Persistence behavior of the JSON turn store and the transcript store.

use std::fs;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

use threadline::memory::{
    AppendOutcome, ConversationBuffer, CorruptPolicy, JsonTurnStore, TranscriptStore, Turn,
};

fn store() -> (TempDir, JsonTurnStore) {
    let dir = TempDir::new().unwrap();
    let store = JsonTurnStore::new(dir.path().join("chat_memory.json"));
    (dir, store)
}

fn read_json(store: &JsonTurnStore) -> Value {
    serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap()
}

#[test]
fn missing_file_loads_empty() {
    let (_dir, store) = store();
    assert!(store.load("alice").is_empty());
    assert!(store.thread_ids().is_empty());
}

#[test]
fn never_written_thread_loads_empty() {
    let (_dir, store) = store();
    store.append("bob", "hey", "hi bob").unwrap();
    assert!(store.load("alice").is_empty());
}

#[test]
fn first_append_produces_expected_document() {
    let (_dir, store) = store();
    let outcome = store.append("alice", "hi", "hello!").unwrap();

    assert_eq!(outcome, AppendOutcome::Appended);
    assert_eq!(
        read_json(&store),
        json!({"alice": [{"user": "hi", "agent": "hello!"}]})
    );
}

#[test]
fn append_then_load_ends_with_the_pair() {
    let (_dir, store) = store();
    store.append("alice", "one", "1").unwrap();
    store.append("alice", "two", "2").unwrap();

    let turns = store.load("alice");
    assert_eq!(turns.last(), Some(&Turn::new("two", "2")));
    assert_eq!(turns.len(), 2);
}

#[test]
fn successive_duplicate_is_stored_once() {
    let (_dir, store) = store();
    store.append("alice", "hi", "hello!").unwrap();
    let outcome = store.append("alice", "hi", "hello!").unwrap();

    assert_eq!(outcome, AppendOutcome::Duplicate);
    assert_eq!(store.load("alice").len(), 1);
}

#[test]
fn same_pair_in_different_threads_is_not_a_duplicate() {
    let (_dir, store) = store();
    store.append("alice", "hi", "hello!").unwrap();
    assert_eq!(
        store.append("bob", "hi", "hello!").unwrap(),
        AppendOutcome::Appended
    );
    assert_eq!(store.thread_ids(), vec!["alice", "bob"]);
}

#[test]
fn corrupt_file_loads_empty_without_error() {
    let (_dir, store) = store();
    fs::write(store.path(), "{ this is not json").unwrap();
    assert!(store.load("alice").is_empty());
}

#[test]
fn append_over_corrupt_file_starts_fresh() {
    let (_dir, store) = store();
    fs::write(store.path(), "garbage").unwrap();
    store.append("alice", "hi", "hello!").unwrap();
    assert_eq!(store.load("alice"), vec![Turn::new("hi", "hello!")]);
}

#[test]
fn recreate_policy_resets_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let store = JsonTurnStore::new(dir.path().join("chat_memory.json"))
        .with_corrupt_policy(CorruptPolicy::Recreate);
    fs::write(store.path(), "garbage").unwrap();

    assert!(store.load("alice").is_empty());
    assert_eq!(read_json(&store), json!({}));
}

#[test]
fn other_threads_survive_an_append() {
    let (_dir, store) = store();
    store.append("alice", "a1", "r1").unwrap();
    store.append("bob", "b1", "r2").unwrap();
    store.append("alice", "a2", "r3").unwrap();

    assert_eq!(store.load("bob"), vec![Turn::new("b1", "r2")]);
    assert_eq!(store.load("alice").len(), 2);
}

#[test]
fn restored_buffer_matches_persisted_turns() {
    let (_dir, store) = store();
    store.append("alice", "I like green tea", "Noted!").unwrap();
    store.append("alice", "What do I like?", "Green tea.").unwrap();

    let buffer = ConversationBuffer::from_turns(&store.load("alice"));
    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.search("green tea").unwrap().text(), "Green tea.");
}

#[test]
fn transcript_and_turn_formats_do_not_mix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");

    TranscriptStore::new(&path)
        .save(&[Turn::new("hi", "hello!")])
        .unwrap();
    assert!(JsonTurnStore::new(&path).load("history").is_empty());
    assert_eq!(
        TranscriptStore::new(&path).load(),
        vec![Turn::new("hi", "hello!")]
    );
}

#[test]
fn transcript_with_odd_line_count_drops_the_tail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chat_history.json");
    fs::write(
        &path,
        r#"{"history": "Human: hi\nAI: hello!\nHuman: are you there?"}"#,
    )
    .unwrap();

    assert_eq!(
        TranscriptStore::new(&path).load(),
        vec![Turn::new("hi", "hello!")]
    );
}
