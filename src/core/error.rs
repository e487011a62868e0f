/// Error types for tool dispatch and configuration loading.
///
/// Upstream API failures never appear here: the weather and energy components
/// absorb them into their demo-data fallback.

use thiserror::Error;

/// Errors a tool call can report back to the MCP client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool is registered under the requested name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments were missing or had the wrong type
    #[error("{0}")]
    InvalidArguments(String),
}

/// Errors raised while reading the process configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_message_names_the_tool() {
        let err = ToolError::UnknownTool("get_stock_quote".to_string());
        assert_eq!(err.to_string(), "Unknown tool: get_stock_quote");
    }

    #[test]
    fn invalid_arguments_message_is_passed_through() {
        let err = ToolError::InvalidArguments("Missing required parameter: location".to_string());
        assert_eq!(err.to_string(), "Missing required parameter: location");
    }
}
