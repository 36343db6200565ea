//! Chat-completions endpoint (`POST {base}/chat/completions`).
//!
//! Requests and responses go through typed wire structs; [`ModelMessage`]s
//! are lowered into the endpoint's message shapes on the way out.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::ThreadlineError;
use crate::types::*;

use super::format::tool_result_to_string;
use super::http::{bearer_headers, parse_sse_data, shared_client, status_to_error};
use super::{ModelProvider, ProviderRequest, ProviderResponse, ToolDefinition};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider for any endpoint speaking the chat-completions dialect.
pub struct OpenAiProvider {
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// `base_url` defaults to [`DEFAULT_BASE_URL`]; a trailing `/` is ignored.
    pub fn new(model: impl Into<String>, api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Self {
            model: model.into(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn chat_request<'a>(&'a self, request: &'a ProviderRequest, stream: bool) -> ChatRequest<'a> {
        let settings = &request.settings;
        ChatRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            stream,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: settings.stop_sequences.as_deref(),
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
            seed: settings.seed,
            user: settings.user.as_deref(),
            tools: request
                .tools
                .as_deref()
                .filter(|tools| !tools.is_empty())
                .map(|tools| tools.iter().map(WireTool::from).collect()),
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, ThreadlineError> {
        let resp = shared_client()
            .post(format!("{}/chat/completions", self.base_url))
            .headers(bearer_headers(&self.api_key))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ThreadlineError> {
        debug!(model = %self.model, messages = request.messages.len(), "chat completion");
        let resp = self.send(&self.chat_request(request, false)).await?;
        let completion: ChatCompletion = serde_json::from_str(&resp.text().await?)?;

        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(ThreadlineError::api(200, "response carried no choices"));
        };
        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            usage: completion.usage.map(Usage::from).unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(AgentToolCall::from)
                .collect(),
            finish_reason: choice.finish_reason.as_deref().and_then(finish_reason),
        })
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, ThreadlineError>>, ThreadlineError>
    {
        debug!(model = %self.model, "streaming chat completion");
        let resp = self.send(&self.chat_request(request, true)).await?;
        let bytes = resp.bytes_stream();

        let stream = async_stream::stream! {
            futures::pin_mut!(bytes);
            let mut lines = LineBuffer::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(ThreadlineError::Network(e));
                        return;
                    }
                };
                for line in lines.push(&chunk) {
                    if let Some(delta) = decode_sse_line(line.trim()) {
                        yield Ok(delta);
                    }
                }
            }
            if let Some(delta) = lines.finish().and_then(|line| decode_sse_line(line.trim())) {
                yield Ok(delta);
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Raw bytes held until a full line arrives.
///
/// Lines are decoded only once complete, so a UTF-8 character split across
/// network chunks is never replaced.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever trails the last newline.
    fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| String::from_utf8_lossy(&self.pending).into_owned())
    }
}

/// One SSE line to a delta. Comments, `[DONE]` and malformed chunks yield nothing.
fn decode_sse_line(line: &str) -> Option<TextStreamDelta> {
    let data = parse_sse_data(line)?;
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            trace!(error = %e, "skipping unparseable stream chunk");
            return None;
        }
    };
    let choice = chunk.choices.into_iter().next()?;
    let finish = choice.finish_reason.as_deref().and_then(finish_reason);
    Some(TextStreamDelta {
        text: choice.delta.content.unwrap_or_default(),
        event_type: match finish {
            Some(_) => StreamEventType::Done,
            None => StreamEventType::TextDelta,
        },
        finish_reason: finish,
        usage: chunk.usage.map(Usage::from),
    })
}

fn finish_reason(raw: &str) -> Option<FinishReason> {
    match raw {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

// request wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImage },
}

#[derive(Debug, Serialize)]
struct WireImage {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded arguments, as the endpoint sends and expects them.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolSpec,
}

#[derive(Debug, Serialize)]
struct WireToolSpec {
    name: String,
    description: String,
    parameters: Value,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ToolDefinition> for WireTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireToolSpec {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

impl From<&ModelMessage> for WireMessage {
    fn from(msg: &ModelMessage) -> Self {
        let mut wire = WireMessage {
            role: msg.role,
            content: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        };

        match msg.content.as_slice() {
            [ContentPart::Text { text }] => wire.content = Some(WireContent::Text(text.clone())),
            [ContentPart::ToolResult(result)] => {
                wire.role = Role::Tool;
                wire.tool_call_id = Some(result.tool_call_id.clone());
                wire.content = Some(WireContent::Text(tool_result_to_string(&result.result)));
            }
            parts if parts.iter().any(|p| matches!(p, ContentPart::ToolCall(_))) => {
                let text = msg.text();
                if !text.is_empty() {
                    wire.content = Some(WireContent::Text(text));
                }
                wire.tool_calls = msg
                    .tool_calls()
                    .into_iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: function_kind(),
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect();
            }
            parts => {
                wire.content = Some(WireContent::Parts(
                    parts
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::Text { text } => {
                                Some(WirePart::Text { text: text.clone() })
                            }
                            ContentPart::Image(image) => Some(WirePart::ImageUrl {
                                image_url: WireImage { url: image.to_url() },
                            }),
                            ContentPart::ToolCall(_) | ContentPart::ToolResult(_) => None,
                        })
                        .collect(),
                ));
            }
        }
        wire
    }
}

// response wire types

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

impl From<WireToolCall> for AgentToolCall {
    fn from(call: WireToolCall) -> Self {
        // models occasionally emit arguments that are not valid JSON
        let arguments = serde_json::from_str(&call.function.arguments)
            .unwrap_or(Value::String(call.function.arguments));
        AgentToolCall {
            id: call.id,
            name: call.function.name,
            arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for Usage {
    fn from(u: WireUsage) -> Self {
        Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new("gpt-4o-mini", "sk-test".into(), None)
    }

    fn body(request: &ProviderRequest, stream: bool) -> Value {
        serde_json::to_value(provider().chat_request(request, stream)).unwrap()
    }

    #[test]
    fn body_carries_model_and_sampling_parameters() {
        let settings = GenerationSettings::builder()
            .max_tokens(150)
            .temperature(0.7)
            .build();
        let request = ProviderRequest::new(vec![ModelMessage::user("hi")], settings);
        let body = body(&request, false);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"], json!([{"role": "user", "content": "hi"}]));
        assert!(body.get("tools").is_none());
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn image_message_becomes_multi_part_content() {
        let msg = ModelMessage::user_with_image(
            "describe",
            ImageSource::Url {
                url: "https://example.com/a.jpg".into(),
            },
        );
        let value = serde_json::to_value(WireMessage::from(&msg)).unwrap();
        assert_eq!(
            value["content"],
            json!([
                {"type": "text", "text": "describe"},
                {"type": "image_url", "image_url": {"url": "https://example.com/a.jpg"}}
            ])
        );
    }

    #[test]
    fn tools_are_wrapped_as_functions() {
        let mut request = ProviderRequest::new(vec![ModelMessage::user("hi")], Default::default());
        request.tools = Some(vec![ToolDefinition {
            name: "translate".into(),
            description: "Translate text".into(),
            parameters: json!({"type": "object"}),
        }]);
        let body = body(&request, true);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "translate");
    }

    #[test]
    fn tool_traffic_round_trips_through_wire_shapes() {
        let call = ModelMessage {
            role: Role::Assistant,
            content: vec![ContentPart::ToolCall(AgentToolCall {
                id: "call_1".into(),
                name: "translate".into(),
                arguments: json!({"text": "hola"}),
            })],
            timestamp: None,
        };
        let value = serde_json::to_value(WireMessage::from(&call)).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value["content"].is_null());
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["arguments"], "{\"text\":\"hola\"}");

        let result = ModelMessage::tool_result("call_1", Value::String("hello".into()), false);
        let value = serde_json::to_value(WireMessage::from(&result)).unwrap();
        assert_eq!(
            value,
            json!({"role": "tool", "content": "hello", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn invalid_tool_arguments_are_kept_as_text() {
        let call = AgentToolCall::from(WireToolCall {
            id: "c".into(),
            kind: function_kind(),
            function: WireFunction {
                name: "translate".into(),
                arguments: "{not json".into(),
            },
        });
        assert_eq!(call.arguments, Value::String("{not json".into()));
    }

    #[test]
    fn sse_lines_decode_to_deltas() {
        let delta = decode_sse_line(r#"data: {"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#)
            .unwrap();
        assert_eq!(delta.text, "Hi");
        assert_eq!(delta.event_type, StreamEventType::TextDelta);

        let done = decode_sse_line(r#"data: {"choices":[{"delta":{},"finish_reason":"length"}]}"#)
            .unwrap();
        assert_eq!(done.finish_reason, Some(FinishReason::Length));
        assert_eq!(done.event_type, StreamEventType::Done);

        assert!(decode_sse_line("data: [DONE]").is_none());
        assert!(decode_sse_line(": ping").is_none());
        assert!(decode_sse_line("data: {broken").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiProvider::new("m", "k".into(), Some("http://localhost:1/v1/".into()));
        assert_eq!(provider.base_url, "http://localhost:1/v1");
    }

    #[test]
    fn line_buffer_keeps_split_characters_whole() {
        let line = "data: 안녕\n".as_bytes();
        let mut buf = LineBuffer::default();
        assert!(buf.push(&line[..7]).is_empty());
        assert!(buf.push(&line[7..9]).is_empty());
        assert_eq!(buf.push(&line[9..]), vec!["data: 안녕\n".to_string()]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn line_buffer_returns_trailing_partial_line() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push(b"a\nb\nda"), vec!["a\n".to_string(), "b\n".to_string()]);
        assert_eq!(buf.finish().as_deref(), Some("da"));
    }
}
