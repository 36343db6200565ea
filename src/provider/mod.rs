//! Model provider trait and the OpenAI chat-completions implementation.

pub(crate) mod format;
pub mod http;
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::ThreadlineConfig;
use crate::error::ThreadlineError;
use crate::types::{
    AgentToolCall, FinishReason, GenerationSettings, ModelMessage, TextStreamDelta, Usage,
};

pub use openai::OpenAiProvider;

/// A request sent to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ModelMessage>,
    pub settings: GenerationSettings,
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ProviderRequest {
    /// A plain request with no tools.
    pub fn new(messages: Vec<ModelMessage>, settings: GenerationSettings) -> Self {
        Self {
            messages,
            settings,
            tools: None,
        }
    }
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Response from a provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: Usage,
    pub tool_calls: Vec<AgentToolCall>,
    pub finish_reason: Option<FinishReason>,
}

impl ProviderResponse {
    /// A text-only response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: Usage::default(),
            tool_calls: Vec::new(),
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

/// Core trait implemented by model providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate text (non-streaming).
    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ThreadlineError>;

    /// Generate text (streaming).
    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, ThreadlineError>>, ThreadlineError>;
}

/// Create the configured provider.
///
/// Fails with [`ThreadlineError::Authentication`] when no API key is set, which
/// is how every model-dependent command refuses to run without credentials.
pub fn create_provider(config: &ThreadlineConfig) -> Result<Box<dyn ModelProvider>, ThreadlineError> {
    let api_key = config.require_api_key()?;
    Ok(Box::new(OpenAiProvider::new(
        config.model.clone(),
        api_key.to_string(),
        config.base_url.clone(),
    )))
}
