//! In-memory chat history for one live session.

use serde_json::{json, Value};

use super::Turn;
use crate::types::{ModelMessage, Role};

/// Ordered user/assistant messages for one thread.
#[derive(Debug, Clone, Default)]
pub struct ConversationBuffer {
    messages: Vec<ModelMessage>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a buffer from persisted turns.
    pub fn from_turns(turns: &[Turn]) -> Self {
        let mut buffer = Self::new();
        for turn in turns {
            buffer.save_context(&turn.user, &turn.agent);
        }
        buffer
    }

    /// Record one exchange.
    pub fn save_context(&mut self, user: &str, agent: &str) {
        self.messages.push(ModelMessage::user(user));
        self.messages.push(ModelMessage::assistant(agent));
    }

    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Adjacent user/assistant pairs, oldest first.
    pub fn turns(&self) -> Vec<Turn> {
        self.messages
            .chunks_exact(2)
            .filter(|pair| pair[0].role == Role::User && pair[1].role == Role::Assistant)
            .map(|pair| Turn::new(pair[0].text(), pair[1].text()))
            .collect()
    }

    /// Number of messages (two per turn).
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Most recent message containing `query`, ignoring case.
    pub fn search(&self, query: &str) -> Option<&ModelMessage> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.messages
            .iter()
            .rev()
            .find(|m| m.text().to_lowercase().contains(&needle))
    }

    /// `{"history": [{"role": "human" | "ai", "content": ..}, ..]}`
    pub fn history_json(&self) -> Value {
        let history: Vec<Value> = self
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.history_label(), "content": m.text() }))
            .collect();
        json!({ "history": history })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ConversationBuffer {
        ConversationBuffer::from_turns(&[
            Turn::new("I like green tea", "Noted!"),
            Turn::new("What about coffee?", "Coffee is fine too, but tea is greener."),
        ])
    }

    #[test]
    fn from_turns_round_trips_through_turns() {
        let buffer = sample();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.turns()[1].user, "What about coffee?");
    }

    #[test]
    fn search_prefers_newest_match() {
        let buffer = sample();
        let hit = buffer.search("GREEN").unwrap();
        assert_eq!(hit.text(), "Coffee is fine too, but tea is greener.");
    }

    #[test]
    fn empty_or_missing_query_finds_nothing() {
        let buffer = sample();
        assert!(buffer.search("").is_none());
        assert!(buffer.search("   ").is_none());
        assert!(buffer.search("juice").is_none());
    }

    #[test]
    fn history_json_labels_roles() {
        let mut buffer = ConversationBuffer::new();
        buffer.save_context("hi", "hello!");
        assert_eq!(
            buffer.history_json(),
            json!({"history": [
                {"role": "human", "content": "hi"},
                {"role": "ai", "content": "hello!"}
            ]})
        );
    }

    #[test]
    fn clear_empties_buffer() {
        let mut buffer = sample();
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.turns().is_empty());
    }
}
