//! Message types for model communication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ModelMessage {
    fn with_parts(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_parts(Role::Assistant, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create a tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        result: serde_json::Value,
        is_error: bool,
    ) -> Self {
        Self::with_parts(
            Role::Tool,
            vec![ContentPart::ToolResult(AgentToolResult {
                tool_call_id: tool_call_id.into(),
                result,
                is_error,
            })],
        )
    }

    /// Create a user message carrying text and one image.
    pub fn user_with_image(text: impl Into<String>, image: ImageSource) -> Self {
        Self::with_parts(
            Role::User,
            vec![ContentPart::Text { text: text.into() }, ContentPart::Image(image)],
        )
    }

    /// Extract the text content, concatenating all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract tool calls from this message.
    pub fn tool_calls(&self) -> Vec<&AgentToolCall> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Speaker label used when history is shown to tools and users.
    pub fn history_label(self) -> &'static str {
        match self {
            Self::User => "human",
            Self::Assistant => "ai",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image(ImageSource),
    ToolCall(AgentToolCall),
    ToolResult(AgentToolResult),
}

/// Where an image comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ImageSource {
    /// Remote image the provider fetches itself.
    Url { url: String },
    /// Inline image bytes, base64 encoded.
    Base64 { data: String, mime_type: String },
}

impl ImageSource {
    /// Render as the `url` value of an OpenAI `image_url` part.
    pub fn to_url(&self) -> String {
        match self {
            Self::Url { url } => url.clone(),
            Self::Base64 { data, mime_type } => format!("data:{mime_type};base64,{data}"),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A tool execution result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentToolResult {
    pub tool_call_id: String,
    pub result: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_joins_only_text_parts() {
        let msg = ModelMessage::user_with_image(
            "what is this?",
            ImageSource::Url {
                url: "https://example.com/cat.png".into(),
            },
        );
        assert_eq!(msg.text(), "what is this?");
        assert_eq!(msg.content.len(), 2);
    }

    #[test]
    fn base64_image_renders_data_url() {
        let image = ImageSource::Base64 {
            data: "AAAA".into(),
            mime_type: "image/png".into(),
        };
        assert_eq!(image.to_url(), "data:image/png;base64,AAAA");
    }

    #[test]
    fn history_labels_name_the_speaker() {
        assert_eq!(Role::User.history_label(), "human");
        assert_eq!(Role::Assistant.history_label(), "ai");
        assert_eq!(Role::Tool.history_label(), "tool");
    }
}
