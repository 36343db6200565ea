//! Single-conversation history stored as a joined transcript string.
//!
//! ```json
//! { "history": "Human: hi\nAI: hello!\nHuman: bye\nAI: see you" }
//! ```
//!
//! Lines are consumed in pairs; a trailing unpaired line is dropped. This
//! format is not interchangeable with [`super::JsonTurnStore`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::json_store::write_json_atomic;
use super::Turn;
use crate::error::Result;

const HUMAN_PREFIX: &str = "Human: ";
const AI_PREFIX: &str = "AI: ";

#[derive(Debug, Serialize, Deserialize)]
struct TranscriptFile {
    history: String,
}

/// File-backed transcript for one conversation.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    path: PathBuf,
}

impl TranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored turns; missing or undecodable files yield an empty history.
    pub fn load(&self) -> Vec<Turn> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "transcript unreadable");
                return Vec::new();
            }
        };
        match serde_json::from_str::<TranscriptFile>(&raw) {
            Ok(file) => parse_transcript(&file.history),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "transcript has no history field");
                Vec::new()
            }
        }
    }

    /// Replace the stored transcript with `turns`.
    pub fn save(&self, turns: &[Turn]) -> Result<()> {
        let file = TranscriptFile {
            history: render_transcript(turns),
        };
        write_json_atomic(&self.path, &file)
    }
}

/// Render turns as `Human: ` / `AI: ` lines.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .flat_map(|t| [format!("{HUMAN_PREFIX}{}", t.user), format!("{AI_PREFIX}{}", t.agent)])
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a transcript blob pairwise.
pub fn parse_transcript(history: &str) -> Vec<Turn> {
    let lines: Vec<&str> = history.split('\n').collect();
    lines
        .chunks_exact(2)
        .map(|pair| {
            let user = pair[0].trim();
            let agent = pair[1].trim();
            Turn::new(
                user.strip_prefix(HUMAN_PREFIX.trim_end()).unwrap_or(user).trim(),
                agent.strip_prefix(AI_PREFIX.trim_end()).unwrap_or(agent).trim(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn parses_pairs_and_strips_prefixes() {
        let turns = parse_transcript("Human: hi\nAI: hello!\nHuman: bye\nAI: see you");
        assert_eq!(
            turns,
            vec![Turn::new("hi", "hello!"), Turn::new("bye", "see you")]
        );
    }

    #[test]
    fn trailing_unpaired_line_is_dropped() {
        let turns = parse_transcript("Human: hi\nAI: hello!\nHuman: anyone?");
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn save_then_load_restores_turns() {
        let dir = TempDir::new().unwrap();
        let store = TranscriptStore::new(dir.path().join("chat_history.json"));
        let turns = vec![Turn::new("one", "two"), Turn::new("three", "four")];
        store.save(&turns).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("Human: one\\nAI: two"));
        assert_eq!(store.load(), turns);
    }

    #[test]
    fn turn_array_file_is_not_a_transcript() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat_memory.json");
        fs::write(&path, r#"{"alice": [{"user": "hi", "agent": "hello"}]}"#).unwrap();
        assert!(TranscriptStore::new(path).load().is_empty());
    }
}
