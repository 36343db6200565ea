//! Machine translation.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ThreadlineError};
use crate::provider::http::{shared_client, status_to_error};

pub const DEFAULT_TRANSLATE_URL: &str = "https://translate.googleapis.com";

/// Translates text into a target language, detecting the source.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

/// Client for Google's keyless `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    base_url: String,
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl GoogleTranslator {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_TRANSLATE_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let url = format!("{}/translate_a/single", self.base_url);
        debug!(target_lang, chars = text.chars().count(), "translating");
        let resp = shared_client()
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if status != 200 {
            return Err(status_to_error(status, &body));
        }
        let value: Value = serde_json::from_str(&body)?;
        parse_translation(&value)
            .ok_or_else(|| ThreadlineError::tool("translate", "unexpected translation response"))
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The payload is `[[["<translated>", "<source>", ..], ..], ..]`.
fn parse_translation(value: &Value) -> Option<String> {
    let segments = value.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_segments() {
        let value = json!([[["Hello. ", "안녕. ", null], ["Nice to meet you", "반가워", null]], null, "ko"]);
        assert_eq!(
            parse_translation(&value).as_deref(),
            Some("Hello. Nice to meet you")
        );
    }

    #[test]
    fn rejects_unexpected_shape() {
        assert!(parse_translation(&json!({"error": "nope"})).is_none());
        assert!(parse_translation(&json!([[]])).is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let t = GoogleTranslator::new(Some("http://localhost:1/".into()));
        assert_eq!(t.base_url, "http://localhost:1");
    }
}
