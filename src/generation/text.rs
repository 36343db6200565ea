//! Non-streaming generation with the tool loop.

use serde_json::json;
use tracing::{debug, warn};

use crate::error::ThreadlineError;
use crate::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use crate::tools::{ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::types::*;

/// Provider round trips allowed before the loop gives up.
pub const MAX_TOOL_ITERATIONS: usize = 20;

/// Ask the model, running any tool calls it makes, until it answers in text.
///
/// Each tool call is dispatched through `tools` with `ctx`, and its result is
/// appended to the conversation for the next round trip. A failing tool
/// becomes an error result the model can react to. Hitting
/// [`MAX_TOOL_ITERATIONS`] returns the last text with [`FinishReason::Length`].
pub async fn generate_text(
    provider: &dyn ModelProvider,
    mut messages: Vec<ModelMessage>,
    settings: GenerationSettings,
    tools: &ToolRegistry,
    ctx: &ToolExecutionContext,
) -> Result<GenerateTextResult, ThreadlineError> {
    let definitions = (!tools.is_empty()).then(|| tools.definitions());
    let mut steps: Vec<GenerationStep> = Vec::new();
    let mut usage = Usage::default();

    for round in 1..=MAX_TOOL_ITERATIONS {
        let request = ProviderRequest {
            messages: messages.clone(),
            settings: settings.clone(),
            tools: definitions.clone(),
        };
        let response = provider.generate_text(&request).await?;
        usage.merge(&response.usage);
        debug!(round, tool_calls = response.tool_calls.len(), "provider round trip");

        if response.tool_calls.is_empty() {
            let finish_reason = response.finish_reason;
            let text = response.text.clone();
            steps.push(step_from(response, Vec::new()));
            return Ok(GenerateTextResult {
                text,
                steps,
                messages,
                usage,
                finish_reason,
            });
        }

        messages.push(assistant_turn(&response));
        let results = run_tool_calls(tools, &response.tool_calls, ctx).await;
        messages.extend(
            results
                .iter()
                .map(|r| ModelMessage::tool_result(&r.tool_call_id, r.result.clone(), r.is_error)),
        );
        steps.push(step_from(response, results));
    }

    warn!(limit = MAX_TOOL_ITERATIONS, "tool loop hit iteration limit");
    Ok(GenerateTextResult {
        text: steps.last().map(|s| s.text.clone()).unwrap_or_default(),
        steps,
        messages,
        usage,
        finish_reason: Some(FinishReason::Length),
    })
}

/// The assistant message that carried the tool calls, echoed back to the model.
fn assistant_turn(response: &ProviderResponse) -> ModelMessage {
    let text = (!response.text.is_empty()).then(|| ContentPart::Text {
        text: response.text.clone(),
    });
    let content = text
        .into_iter()
        .chain(response.tool_calls.iter().cloned().map(ContentPart::ToolCall))
        .collect();
    ModelMessage {
        role: Role::Assistant,
        content,
        timestamp: Some(chrono::Utc::now()),
    }
}

async fn run_tool_calls(
    tools: &ToolRegistry,
    calls: &[AgentToolCall],
    ctx: &ToolExecutionContext,
) -> Vec<AgentToolResult> {
    let mut results = Vec::with_capacity(calls.len());
    for call in calls {
        let args = ToolArguments::new(call.arguments.clone());
        let (result, is_error) = match tools.invoke(&call.name, &args, ctx).await {
            Ok(value) => (value, false),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                (json!({ "error": e.to_string() }), true)
            }
        };
        results.push(AgentToolResult {
            tool_call_id: call.id.clone(),
            result,
            is_error,
        });
    }
    results
}

fn step_from(response: ProviderResponse, tool_results: Vec<AgentToolResult>) -> GenerationStep {
    GenerationStep {
        text: response.text,
        tool_calls: response.tool_calls,
        tool_results,
        usage: response.usage,
        finish_reason: response.finish_reason,
    }
}
