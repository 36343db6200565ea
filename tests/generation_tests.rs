//! Tool loop behavior using the mock provider.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::MockProvider;
use serde_json::json;
use threadline::error::ThreadlineError;
use threadline::generation::{generate_text, text::MAX_TOOL_ITERATIONS};
use threadline::tools::{AgentTool, AgentToolParameters, ToolExecutionContext, ToolRegistry};
use threadline::types::*;

fn counting_tool(counter: Arc<AtomicUsize>) -> ToolRegistry {
    ToolRegistry::new().with(Arc::new(AgentTool::new(
        "count",
        "Counts calls",
        AgentToolParameters::empty(),
        move |_, _| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(json!({ "calls": n }))
            }
        },
    )))
}

#[tokio::test]
async fn text_only_response_skips_tools() {
    let provider = MockProvider::new("mock");
    provider.queue_response("Hello!");

    let result = generate_text(
        &provider,
        vec![ModelMessage::user("hi")],
        GenerationSettings::default(),
        &ToolRegistry::new(),
        &ToolExecutionContext::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.text, "Hello!");
    assert_eq!(result.steps.len(), 1);
    assert!(provider.last_request().unwrap().tools.is_none());
}

#[tokio::test]
async fn tool_results_are_fed_back() {
    let provider = MockProvider::new("mock");
    provider.queue_tool_call("call_1", "count", json!({}));
    provider.queue_response("Counted once.");
    let counter = Arc::new(AtomicUsize::new(0));

    let result = generate_text(
        &provider,
        vec![ModelMessage::user("count please")],
        GenerationSettings::default(),
        &counting_tool(counter.clone()),
        &ToolExecutionContext::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.text, "Counted once.");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(result.usage.total_tokens, 45);

    let second = &provider.requests()[1];
    let last = second.messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    match &last.content[0] {
        ContentPart::ToolResult(r) => {
            assert_eq!(r.tool_call_id, "call_1");
            assert_eq!(r.result, json!({"calls": 1}));
            assert!(!r.is_error);
        }
        other => panic!("expected tool result, got {other:?}"),
    }
    assert_eq!(second.tools.as_ref().unwrap()[0].name, "count");
}

#[tokio::test]
async fn unknown_tool_becomes_error_result() {
    let provider = MockProvider::new("mock");
    provider.queue_tool_call("call_1", "missing", json!({}));
    provider.queue_response("Sorry, that tool is unavailable.");

    let result = generate_text(
        &provider,
        vec![ModelMessage::user("do it")],
        GenerationSettings::default(),
        &counting_tool(Arc::new(AtomicUsize::new(0))),
        &ToolExecutionContext::default(),
    )
    .await
    .unwrap();

    let tool_result = &result.steps[0].tool_results[0];
    assert!(tool_result.is_error);
    assert!(tool_result.result["error"]
        .as_str()
        .unwrap()
        .contains("missing"));
    assert_eq!(result.text, "Sorry, that tool is unavailable.");
}

#[tokio::test]
async fn loop_stops_at_iteration_limit() {
    let provider = MockProvider::new("mock");
    for i in 0..MAX_TOOL_ITERATIONS + 5 {
        provider.queue_tool_call(&format!("call_{i}"), "count", json!({}));
    }
    let counter = Arc::new(AtomicUsize::new(0));

    let result = generate_text(
        &provider,
        vec![ModelMessage::user("loop")],
        GenerationSettings::default(),
        &counting_tool(counter.clone()),
        &ToolExecutionContext::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.steps.len(), MAX_TOOL_ITERATIONS);
    assert_eq!(counter.load(Ordering::SeqCst), MAX_TOOL_ITERATIONS);
    assert_eq!(result.finish_reason, Some(FinishReason::Length));
}

#[tokio::test]
async fn provider_error_propagates() {
    let provider = MockProvider::new("mock");
    provider.queue_error(ThreadlineError::Authentication("bad key".into()));

    let err = generate_text(
        &provider,
        vec![ModelMessage::user("hi")],
        GenerationSettings::default(),
        &ToolRegistry::new(),
        &ToolExecutionContext::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ThreadlineError::Authentication(_)));
}
