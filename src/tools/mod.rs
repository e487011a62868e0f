/// Tools Module
///
/// Each tool is a separate module exporting a `register` function that adds
/// the tool to the registry during server initialization, plus the text
/// renderer for its result.

pub mod energy;
pub mod weather;

use serde_json::Value;

use crate::core::error::ToolError;

/// Argument object of a tool call; anything other than a JSON object is rejected.
fn arguments_object(args: &Value) -> Result<&serde_json::Map<String, Value>, ToolError> {
    args.as_object()
        .ok_or_else(|| ToolError::InvalidArguments("Arguments must be a JSON object".to_string()))
}

/// Optional string argument; null counts as absent.
fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match arguments_object(args)?.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "Parameter '{key}' must be a string"
        ))),
    }
}

/// Optional boolean argument; null counts as absent.
fn optional_bool(args: &Value, key: &str) -> Result<Option<bool>, ToolError> {
    match arguments_object(args)?.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "Parameter '{key}' must be a boolean"
        ))),
    }
}
