//! Per-thread turn history persisted as one JSON object per file.
//!
//! ```json
//! {
//!     "alice": [ { "user": "hi", "agent": "hello!" } ],
//!     "bob": []
//! }
//! ```
//!
//! Every append rewrites the whole file (temp file + rename). There is no
//! locking: two processes appending to the same file race and the last
//! rewrite wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::Turn;
use crate::error::Result;

/// What `load` does when the file exists but is not a JSON object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptPolicy {
    /// Report an empty history and leave the bytes alone.
    #[default]
    TreatAsEmpty,
    /// Report an empty history and rewrite the file as `{}`.
    Recreate,
}

/// Result of [`JsonTurnStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The pair equals the thread's most recent turn; nothing was written.
    Duplicate,
    /// One side was empty; nothing was written.
    Skipped,
}

/// File-backed turn store keyed by thread id.
#[derive(Debug, Clone)]
pub struct JsonTurnStore {
    path: PathBuf,
    corrupt_policy: CorruptPolicy,
}

enum Document {
    Missing,
    Parsed(Map<String, Value>),
    Corrupt,
}

impl JsonTurnStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            corrupt_policy: CorruptPolicy::default(),
        }
    }

    pub fn with_corrupt_policy(mut self, policy: CorruptPolicy) -> Self {
        self.corrupt_policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turns stored for `thread_id`, oldest first.
    ///
    /// A missing file, a missing key, or undecodable content all yield an
    /// empty history rather than an error. Entries lacking either side are
    /// skipped.
    pub fn load(&self, thread_id: &str) -> Vec<Turn> {
        let doc = match self.read_document() {
            Ok(Document::Parsed(doc)) => doc,
            Ok(Document::Missing) => {
                debug!(path = %self.path.display(), "memory file not found");
                return Vec::new();
            }
            Ok(Document::Corrupt) => {
                warn!(path = %self.path.display(), "memory file is not valid JSON; treating as empty");
                if self.corrupt_policy == CorruptPolicy::Recreate {
                    if let Err(e) = write_json_atomic(&self.path, &Map::new()) {
                        warn!(path = %self.path.display(), error = %e, "failed to recreate memory file");
                    }
                }
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "memory file unreadable; treating as empty");
                return Vec::new();
            }
        };

        let Some(entries) = doc.get(thread_id) else {
            debug!(thread_id, "no stored history for thread");
            return Vec::new();
        };
        let turns = decode_turns(entries);
        info!(thread_id, turns = turns.len(), path = %self.path.display(), "loaded history");
        turns
    }

    /// Append one turn for `thread_id` and rewrite the file.
    ///
    /// Nothing is written when either side is empty, since `load` would drop
    /// such a turn, or when the pair equals the thread's most recent turn.
    /// Existing threads keep their position in the file.
    pub fn append(
        &self,
        thread_id: &str,
        user_text: &str,
        agent_text: &str,
    ) -> Result<AppendOutcome> {
        let turn = Turn::new(user_text, agent_text);
        if !turn.is_complete() {
            debug!(thread_id, "not storing a turn with an empty side");
            return Ok(AppendOutcome::Skipped);
        }

        let mut doc = match self.read_document()? {
            Document::Parsed(doc) => doc,
            Document::Missing => Map::new(),
            Document::Corrupt => {
                warn!(path = %self.path.display(), "memory file is not valid JSON; starting over");
                Map::new()
            }
        };

        let slot = doc.entry(thread_id.to_string()).or_insert(Value::Null);
        let mut list = match std::mem::take(slot) {
            Value::Array(list) => list,
            Value::Null => Vec::new(),
            _ => {
                warn!(thread_id, "stored history is not an array; replacing it");
                Vec::new()
            }
        };

        let is_repeat = list
            .last()
            .and_then(decode_turn)
            .is_some_and(|last| last == turn);
        if is_repeat {
            debug!(thread_id, "skipping duplicate turn");
            return Ok(AppendOutcome::Duplicate);
        }
        list.push(serde_json::to_value(&turn)?);
        *slot = Value::Array(list);

        write_json_atomic(&self.path, &doc)?;
        info!(thread_id, path = %self.path.display(), "saved turn");
        Ok(AppendOutcome::Appended)
    }

    /// Thread ids present in the file, sorted.
    pub fn thread_ids(&self) -> Vec<String> {
        match self.read_document() {
            Ok(Document::Parsed(doc)) => {
                let mut ids: Vec<String> = doc.keys().cloned().collect();
                ids.sort();
                ids
            }
            _ => Vec::new(),
        }
    }

    fn read_document(&self) -> Result<Document> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::Missing),
            Err(e) if e.kind() == ErrorKind::InvalidData => return Ok(Document::Corrupt),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Document::Corrupt);
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(doc)) => Ok(Document::Parsed(doc)),
            _ => Ok(Document::Corrupt),
        }
    }
}

fn decode_turn(value: &Value) -> Option<Turn> {
    let user = value.get("user")?.as_str()?;
    let agent = value.get("agent")?.as_str()?;
    Some(Turn::new(user, agent))
}

fn decode_turns(value: &Value) -> Vec<Turn> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(decode_turn)
                .filter(Turn::is_complete)
                .collect()
        })
        .unwrap_or_default()
}

/// Serialize with 4-space indentation and replace `path` via a sibling temp file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut ser)?;
    bytes.push(b'\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
