//! Config files on disk.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use threadline::config::ThreadlineConfig;
use threadline::error::ThreadlineError;

#[test]
fn file_values_overlay_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("threadline.toml");
    std::fs::write(
        &path,
        r#"
model = "gpt-4o"
max_tokens = 512
temperature = 0.3
system_prompt = "You are a warm friend."
memory_file = "memories/chat.json"
session_capacity = 4

[urls]
translate = "http://localhost:8081"
"#,
    )
    .unwrap();

    let mut config = ThreadlineConfig::new();
    config.merge_file(&path).unwrap();

    assert_eq!(config.model, "gpt-4o");
    assert_eq!(config.max_tokens, Some(512));
    assert_eq!(config.temperature, Some(0.3));
    assert_eq!(config.system_prompt.as_deref(), Some("You are a warm friend."));
    assert_eq!(config.memory_file, PathBuf::from("memories/chat.json"));
    assert_eq!(config.session_capacity, 4);
    assert_eq!(config.translate_url.as_deref(), Some("http://localhost:8081"));
    assert!(config.base_url.is_none());
}

#[test]
fn malformed_file_names_the_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("threadline.toml");
    std::fs::write(&path, "model = [").unwrap();

    let err = ThreadlineConfig::load(&path).unwrap_err();
    match err {
        ThreadlineError::Configuration(msg) => assert!(msg.contains("threadline.toml")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = ThreadlineConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ThreadlineError::Io(_)));
}
