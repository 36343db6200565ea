//! Graph execution for the task router.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{
    InputSource, Node, RouterEvent, Task, TaskState, ENDED_MESSAGE, UNKNOWN_TASK_MESSAGE,
};
use crate::agent::ControlCommand;
use crate::error::Result;
use crate::generation::complete;
use crate::provider::ModelProvider;
use crate::tools::{ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::types::GenerationSettings;

const CLASSIFY_SYSTEM: &str = "You route user requests. Answer with exactly one word.";

/// Runs the translate / summarize / analyze graph.
#[derive(Clone)]
pub struct TaskRouter {
    provider: Arc<dyn ModelProvider>,
    tools: ToolRegistry,
    settings: GenerationSettings,
}

impl TaskRouter {
    /// `tools` must provide the tools named by [`Task::tool_name`].
    pub fn new(provider: Arc<dyn ModelProvider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Ask the model which task `input` calls for.
    pub async fn classify(&self, input: &str) -> Result<Option<Task>> {
        let prompt = format!(
            "Name the task to perform on the following input with a single word: \
             translate, summarize, or analyze.\n\nInput: {input}"
        );
        let reply = complete(
            self.provider.as_ref(),
            CLASSIFY_SYSTEM,
            prompt,
            self.settings.clone(),
        )
        .await?;
        debug!(reply, "task classification");
        Ok(Task::from_reply(&reply))
    }

    /// Run `task` on `input`. Tool failures come back as `error: ...` text.
    pub async fn execute(&self, task: Task, input: &str) -> String {
        let args = match task {
            Task::Translate => ToolArguments::new(json!({ "text": input, "target_lang": "en" })),
            Task::Summarize | Task::Analyze => ToolArguments::text(input),
        };
        let ctx = ToolExecutionContext::default();
        match self.tools.invoke(task.tool_name(), &args, &ctx).await {
            Ok(value) => render_result(task, &value),
            Err(e) => {
                warn!(%task, error = %e, "task failed");
                format!("error: {e}")
            }
        }
    }

    /// Execute one node and return the next one.
    pub async fn step(
        &self,
        node: Node,
        state: &mut TaskState,
        input: &mut dyn InputSource,
    ) -> Option<Node> {
        match node {
            Node::GetInput => {
                *state = TaskState::default();
                match input.next_line().await {
                    Some(line) if ControlCommand::parse(&line).is_none() => {
                        state.user_input = line.trim().to_string();
                    }
                    _ => state.end = true,
                }
            }
            Node::ParseTask => {
                if !state.end {
                    self.parse_task(state).await;
                }
            }
            Node::ExecuteTask => {
                // ParseTask only routes here with a task set.
                if let Some(task) = state.parsed_task {
                    state.task_result = self.execute(task, &state.user_input).await;
                }
            }
            Node::HandleError => {
                state.task_result = state.error.clone().unwrap_or_default();
            }
            Node::End => {
                state.task_result = ENDED_MESSAGE.to_string();
            }
        }
        debug!(%node, ?state, "router node");
        node.next(state)
    }

    async fn parse_task(&self, state: &mut TaskState) {
        if state.user_input.is_empty() {
            state.error = Some(UNKNOWN_TASK_MESSAGE.to_string());
            return;
        }
        match self.classify(&state.user_input).await {
            Ok(Some(task)) => {
                state.parsed_task = Some(task);
                state.error = None;
            }
            Ok(None) => state.error = Some(UNKNOWN_TASK_MESSAGE.to_string()),
            Err(e) => {
                warn!(error = %e, "task classification failed");
                state.error = Some(format!("error: {e}"));
            }
        }
    }

    /// Run from `GetInput` until the cycle returns to `GetInput` or ends.
    pub async fn run_cycle(&self, input: &mut dyn InputSource) -> (TaskState, RouterEvent) {
        let mut state = TaskState::default();
        let mut node = Node::GetInput;
        loop {
            let next = self.step(node, &mut state, input).await;
            match (node, next) {
                (Node::ExecuteTask | Node::HandleError, _) | (_, None) => break,
                (_, Some(n)) => node = n,
            }
        }

        let message = state.task_result.clone();
        let event = match (node, state.parsed_task) {
            (Node::End, _) => RouterEvent::Ended { message },
            (Node::ExecuteTask, Some(task)) => RouterEvent::Completed {
                task,
                output: message,
            },
            _ => RouterEvent::Rejected { message },
        };
        (state, event)
    }

    /// Cycle until the input ends or an exit word arrives, reporting each cycle.
    pub async fn run<F>(&self, input: &mut dyn InputSource, mut on_event: F) -> TaskState
    where
        F: FnMut(&RouterEvent),
    {
        loop {
            let (state, event) = self.run_cycle(input).await;
            on_event(&event);
            if state.end {
                return state;
            }
        }
    }
}

fn render_result(task: Task, value: &Value) -> String {
    let text = value.as_str().map(str::to_string);
    match task {
        Task::Translate => format!("translation: {}", text.unwrap_or_else(|| value.to_string())),
        Task::Summarize => format!("summary: {}", text.unwrap_or_else(|| value.to_string())),
        Task::Analyze => {
            let label = value.get("label").and_then(Value::as_str).unwrap_or("neutral");
            let compound = value.get("compound").and_then(Value::as_f64).unwrap_or(0.0);
            format!("sentiment: {label} (score: {compound:.4})")
        }
    }
}

impl std::fmt::Debug for TaskRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRouter")
            .field("model", &self.provider.model_id())
            .field("tools", &self.tools)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sentiment() {
        let value = json!({"label": "positive", "compound": 0.6369, "analyzed_text": "I love it"});
        assert_eq!(
            render_result(Task::Analyze, &value),
            "sentiment: positive (score: 0.6369)"
        );
        assert_eq!(
            render_result(Task::Translate, &json!("Hello")),
            "translation: Hello"
        );
    }
}
