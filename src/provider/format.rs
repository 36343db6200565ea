//! Provider formatting helpers.

use serde_json::Value;

/// Convert a tool result JSON value into the string payload a provider expects.
///
/// Plain strings pass through unquoted so tools that return prose read naturally.
pub(crate) fn tool_result_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
