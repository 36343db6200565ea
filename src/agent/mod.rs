//! Conversational agent over a session's history.

pub mod chat;

pub use chat::{ChatAgent, UserInput};

const EXIT_WORDS: &[&str] = &["quit", "exit", "그만", "종료"];
const SHUTDOWN_WORDS: &[&str] = &["kernel shutdown", "커널 종료"];

/// Inputs that control the REPL instead of reaching the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Leave the current conversation loop.
    Exit,
    /// Persist and end the whole process.
    Shutdown,
}

impl ControlCommand {
    /// Recognize an exit or shutdown word, ignoring case and surrounding space.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_lowercase();
        if SHUTDOWN_WORDS.contains(&normalized.as_str()) {
            Some(Self::Shutdown)
        } else if EXIT_WORDS.contains(&normalized.as_str()) {
            Some(Self::Exit)
        } else {
            None
        }
    }
}
