//! Typed access to tool call arguments.

use serde_json::Value;

use crate::error::ThreadlineError;

/// Arguments for one tool invocation.
///
/// Models sometimes send arguments as a JSON-encoded string instead of an
/// object; [`ToolArguments::new`] normalizes that form.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        let value = match value {
            Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(trimmed).unwrap_or(Value::String(raw))
                }
            }
            other => other,
        };
        Self { value }
    }

    /// Arguments carrying a single `text` field.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(serde_json::json!({ "text": text.into() }))
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Required string argument.
    pub fn get_str(&self, key: &str) -> Result<&str, ThreadlineError> {
        self.get_str_opt(key).ok_or_else(|| {
            ThreadlineError::InvalidArgument(format!("Missing string argument: {key}"))
        })
    }

    /// Optional string argument; blank strings count as absent.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str_opt(key).unwrap_or(default)
    }

    /// Deserialize the whole argument object into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ThreadlineError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            ThreadlineError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_encoded_arguments_are_parsed() {
        let args = ToolArguments::new(json!("{\"text\": \"hola\"}"));
        assert_eq!(args.get_str("text").unwrap(), "hola");
    }

    #[test]
    fn blank_string_becomes_empty_object() {
        let args = ToolArguments::new(json!("  "));
        assert!(args.raw().as_object().unwrap().is_empty());
    }

    #[test]
    fn missing_argument_is_invalid() {
        let args = ToolArguments::new(json!({"text": ""}));
        assert!(matches!(
            args.get_str("text"),
            Err(ThreadlineError::InvalidArgument(msg)) if msg.contains("text")
        ));
        assert_eq!(args.get_str_or("target_lang", "en"), "en");
    }

    #[test]
    fn deserializes_into_struct() {
        #[derive(serde::Deserialize)]
        struct Req {
            text: String,
            target_lang: Option<String>,
        }
        let req: Req = ToolArguments::new(json!({"text": "hi", "target_lang": "ko"}))
            .deserialize()
            .unwrap();
        assert_eq!(req.text, "hi");
        assert_eq!(req.target_lang.as_deref(), Some("ko"));
    }
}
