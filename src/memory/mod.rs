//! Conversation memory: persisted turn stores and the in-memory buffer.
//!
//! Two persisted formats exist and are deliberately kept apart:
//!
//! - [`JsonTurnStore`]: one JSON object per file mapping thread ids to arrays
//!   of `{"user": .., "agent": ..}` objects.
//! - [`TranscriptStore`]: a single `"history"` string of newline-joined
//!   `Human: ` / `AI: ` lines.
//!
//! Neither converts to the other.

pub mod buffer;
pub mod json_store;
pub mod transcript;

pub use buffer::ConversationBuffer;
pub use json_store::{AppendOutcome, CorruptPolicy, JsonTurnStore};
pub use transcript::TranscriptStore;

use serde::{Deserialize, Serialize};

/// One (user input, agent reply) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub agent: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            agent: agent.into(),
        }
    }

    /// Both sides carry text.
    pub fn is_complete(&self) -> bool {
        !self.user.is_empty() && !self.agent.is_empty()
    }
}
