//! Task routing as an explicit state graph.
//!
//! ```text
//! GetInput -> ParseTask -> { End | HandleError | ExecuteTask }
//! ExecuteTask -> GetInput
//! HandleError -> GetInput
//! ```

pub mod graph;

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

use crate::tools::builtin::{ANALYZE_SENTIMENT, SUMMARIZE, TRANSLATE};

pub use graph::TaskRouter;

/// Shown when the model's answer names no known task.
pub const UNKNOWN_TASK_MESSAGE: &str = "could not determine a task; please try again";
pub const ENDED_MESSAGE: &str = "conversation ended";

/// Work the router can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Task {
    #[strum(to_string = "translate", serialize = "번역")]
    Translate,
    #[strum(to_string = "summarize", serialize = "요약")]
    Summarize,
    #[strum(to_string = "analyze", serialize = "분석")]
    Analyze,
}

impl Task {
    /// Tool that performs the task.
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Translate => TRANSLATE,
            Self::Summarize => SUMMARIZE,
            Self::Analyze => ANALYZE_SENTIMENT,
        }
    }

    /// Read a one-word model answer, tolerating case and trailing punctuation.
    pub fn from_reply(reply: &str) -> Option<Self> {
        let word = reply
            .trim()
            .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
        word.parse().ok()
    }
}

/// State threaded through the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskState {
    pub user_input: String,
    pub parsed_task: Option<Task>,
    pub task_result: String,
    pub error: Option<String>,
    pub end: bool,
}

/// Graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Node {
    GetInput,
    ParseTask,
    ExecuteTask,
    HandleError,
    End,
}

impl Node {
    /// The edge leaving this node for `state`. `End` has no successor.
    pub fn next(self, state: &TaskState) -> Option<Node> {
        match self {
            Self::GetInput => Some(Self::ParseTask),
            Self::ParseTask => Some(if state.end {
                Self::End
            } else if state.error.is_some() {
                Self::HandleError
            } else {
                Self::ExecuteTask
            }),
            Self::ExecuteTask | Self::HandleError => Some(Self::GetInput),
            Self::End => None,
        }
    }
}

/// What the router reports after each cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    Completed { task: Task, output: String },
    Rejected { message: String },
    Ended { message: String },
}

/// Where the router reads user lines from. `None` means no more input.
#[async_trait]
pub trait InputSource: Send {
    async fn next_line(&mut self) -> Option<String>;
}

/// Scripted input, mainly for tests and batch runs.
#[async_trait]
impl InputSource for VecDeque<String> {
    async fn next_line(&mut self) -> Option<String> {
        self.pop_front()
    }
}
