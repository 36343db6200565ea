//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::arguments::ToolArguments;
use super::types::AgentToolParameters;
use crate::error::ThreadlineError;
use crate::memory::ConversationBuffer;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Thread the call belongs to, if any.
    pub thread_id: Option<String>,
    /// Snapshot of the thread's history at the time of the call.
    pub memory: Option<Arc<ConversationBuffer>>,
    pub metadata: Value,
}

impl ToolExecutionContext {
    pub fn for_thread(thread_id: impl Into<String>, memory: ConversationBuffer) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            memory: Some(Arc::new(memory)),
            metadata: Value::Null,
        }
    }
}

/// A named function the model (or the router) can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model calls the tool by.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments.
    fn parameters(&self) -> &AgentToolParameters;

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, ThreadlineError>;
}

type ToolHandler = dyn Fn(
        ToolArguments,
        ToolExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ThreadlineError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ThreadlineError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, ThreadlineError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closure_tool_sees_arguments_and_context() {
        let tool = AgentTool::new(
            "echo_thread",
            "Echo the thread id and text",
            AgentToolParameters::object().string("text", "Text", true).build(),
            |args, ctx| async move {
                let text = args.get_str("text")?.to_string();
                Ok(json!({ "thread": ctx.thread_id, "text": text }))
            },
        );

        let ctx = ToolExecutionContext::for_thread("alice", ConversationBuffer::new());
        let out = tool
            .execute(&ToolArguments::text("hi"), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!({"thread": "alice", "text": "hi"}));
        assert_eq!(tool.name(), "echo_thread");
    }
}
