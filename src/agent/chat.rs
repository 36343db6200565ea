//! One exchange: history + tools + model.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, ThreadlineError};
use crate::generation::generate_text;
use crate::memory::ConversationBuffer;
use crate::provider::ModelProvider;
use crate::session::Session;
use crate::tools::{ToolExecutionContext, ToolRegistry};
use crate::types::{GenerationSettings, ImageSource, ModelMessage};
use crate::util::text::preview;
use crate::util::url::{extract_url_and_text, is_image_url, DEFAULT_IMAGE_PROMPT};

/// A user turn after image extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInput {
    pub text: String,
    pub image: Option<ImageSource>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// Text plus an image; blank text falls back to the default image prompt.
    pub fn with_image(text: impl Into<String>, image: ImageSource) -> Self {
        let text = text.into();
        let text = if text.trim().is_empty() {
            DEFAULT_IMAGE_PROMPT.to_string()
        } else {
            text
        };
        Self {
            text,
            image: Some(image),
        }
    }

    pub fn to_message(&self) -> ModelMessage {
        match &self.image {
            Some(image) => ModelMessage::user_with_image(&self.text, image.clone()),
            None => ModelMessage::user(&self.text),
        }
    }
}

/// Chat agent shared by every thread; per-thread state lives in [`Session`].
#[derive(Clone)]
pub struct ChatAgent {
    provider: Arc<dyn ModelProvider>,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    settings: GenerationSettings,
    check_image_urls: bool,
}

impl ChatAgent {
    pub fn new(provider: Arc<dyn ModelProvider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            system_prompt: None,
            settings: GenerationSettings::default(),
            check_image_urls: true,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Skip the HEAD request that confirms a URL points at an image.
    pub fn with_image_check(mut self, enabled: bool) -> Self {
        self.check_image_urls = enabled;
        self
    }

    pub fn provider(&self) -> &dyn ModelProvider {
        self.provider.as_ref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Split raw input into prompt text and an optional image URL.
    ///
    /// The first `http(s)` URL is treated as an image when a HEAD request
    /// reports `image/*`; otherwise it is dropped with a warning.
    pub async fn prepare_input(&self, input: &str) -> UserInput {
        let (url, text) = extract_url_and_text(input);
        let Some(url) = url else {
            return UserInput::text(text);
        };
        if !self.check_image_urls || is_image_url(&url).await {
            debug!(%url, "attaching image");
            return UserInput::with_image(text, ImageSource::Url { url });
        }
        warn!(%url, "URL does not point to an image; ignoring it");
        if text.is_empty() {
            UserInput::text(input.trim())
        } else {
            UserInput::text(text)
        }
    }

    /// Reply to raw input in the context of `session`. The caller records the turn.
    pub async fn respond(&self, session: &Session, input: &str) -> Result<String> {
        let input = self.prepare_input(input).await;
        self.respond_to(&session.thread_id, &session.buffer, &input).await
    }

    /// Reply to an already prepared input.
    pub async fn respond_to(
        &self,
        thread_id: &str,
        history: &ConversationBuffer,
        input: &UserInput,
    ) -> Result<String> {
        if input.text.trim().is_empty() && input.image.is_none() {
            return Err(ThreadlineError::InvalidInput("empty message".into()));
        }

        let messages = self.build_messages(history, input);
        let ctx = ToolExecutionContext::for_thread(thread_id, history.clone());
        debug!(
            thread_id,
            history = history.len(),
            tools = self.tools.len(),
            input = %preview(&input.text, 80),
            "requesting reply"
        );
        let result = generate_text(
            self.provider.as_ref(),
            messages,
            self.settings.clone(),
            &self.tools,
            &ctx,
        )
        .await?;
        Ok(result.text.trim().to_string())
    }

    fn build_messages(&self, history: &ConversationBuffer, input: &UserInput) -> Vec<ModelMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(ref sys) = self.system_prompt {
            messages.push(ModelMessage::system(sys.clone()));
        }
        messages.extend(history.messages().iter().cloned());
        messages.push(input.to_message());
        messages
    }
}

impl std::fmt::Debug for ChatAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAgent")
            .field("model", &self.provider.model_id())
            .field("tools", &self.tools)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}
