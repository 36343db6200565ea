//! Single-call helpers used by tools that delegate to the model.

use crate::error::ThreadlineError;
use crate::provider::{ModelProvider, ProviderRequest};
use crate::types::*;

/// System prompt + one user message → reply text. No tools.
pub async fn complete(
    provider: &dyn ModelProvider,
    system: &str,
    prompt: impl Into<String>,
    settings: GenerationSettings,
) -> Result<String, ThreadlineError> {
    let mut messages = Vec::with_capacity(2);
    if !system.is_empty() {
        messages.push(ModelMessage::system(system));
    }
    messages.push(ModelMessage::user(prompt));
    let response = provider
        .generate_text(&ProviderRequest::new(messages, settings))
        .await?;
    Ok(response.text.trim().to_string())
}
