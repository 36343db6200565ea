//! Shared test helpers and mock provider.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use threadline::error::ThreadlineError;
use threadline::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use threadline::types::*;

/// A mock provider that returns queued responses and records requests.
pub struct MockProvider {
    model_id: String,
    responses: Mutex<VecDeque<Result<ProviderResponse, ThreadlineError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(ProviderResponse {
            text: text.to_string(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
            },
            tool_calls: vec![],
            finish_reason: Some(FinishReason::Stop),
        }));
    }

    /// Queue a tool call response.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: Value) {
        self.responses.lock().unwrap().push_back(Ok(ProviderResponse {
            text: String::new(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            },
            tool_calls: vec![AgentToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: Some(FinishReason::ToolCalls),
        }));
    }

    /// Queue a provider failure.
    pub fn queue_error(&self, error: ThreadlineError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn next(&self, request: &ProviderRequest) -> Result<ProviderResponse, ThreadlineError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ProviderResponse::text("Mock response")))
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ThreadlineError> {
        self.next(request)
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, ThreadlineError>>, ThreadlineError> {
        let text = self.next(request)?.text;

        let stream = async_stream::stream! {
            for chunk in text.chars().collect::<Vec<_>>().chunks(5) {
                let text: String = chunk.iter().collect();
                yield Ok(TextStreamDelta {
                    text,
                    event_type: StreamEventType::TextDelta,
                    finish_reason: None,
                    usage: None,
                });
            }
            yield Ok(TextStreamDelta {
                text: String::new(),
                event_type: StreamEventType::Done,
                finish_reason: Some(FinishReason::Stop),
                usage: Some(Usage { input_tokens: 10, output_tokens: 20, total_tokens: 30 }),
            });
        };

        Ok(Box::pin(stream))
    }
}

/// Translator that prefixes the target language, or fails when asked to.
pub struct FakeTranslator {
    pub fail: bool,
}

#[async_trait]
impl threadline::services::Translator for FakeTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> threadline::error::Result<String> {
        if self.fail {
            return Err(ThreadlineError::api(503, "translator down"));
        }
        Ok(format!("[{target_lang}] {text}"))
    }
}

/// Translator that returns its input unchanged.
pub struct IdentityTranslator;

#[async_trait]
impl threadline::services::Translator for IdentityTranslator {
    async fn translate(&self, text: &str, _target_lang: &str) -> threadline::error::Result<String> {
        Ok(text.to_string())
    }
}

/// Search engine with a fixed answer.
pub struct FakeSearch(pub Option<String>);

#[async_trait]
impl threadline::services::SearchEngine for FakeSearch {
    async fn search(&self, _query: &str) -> threadline::error::Result<String> {
        self.0
            .clone()
            .ok_or_else(|| ThreadlineError::tool("search_summary", "no search results"))
    }
}
