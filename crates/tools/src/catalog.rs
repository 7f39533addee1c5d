//! Tool trait and descriptor types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default timeout for tool execution (seconds)
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Tool execution errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Invalid parameter schema for {tool}: {message}")]
    InvalidSchema { tool: String, message: String },

    #[error("Tool {tool} timed out after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Whether the failure was the execution deadline expiring
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::Timeout { .. })
    }
}

/// Static descriptor for one catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name, as offered to the model
    pub name: String,
    /// Tool description, as offered to the model
    pub description: String,
    /// Announcement spoken to the caller before invocation
    pub say: String,
    /// JSON schema for arguments
    pub parameters: Value,
    /// JSON schema for the result value
    pub returns: Value,
}

/// An invocable tool
///
/// Implementations are registered once at startup and shared read-only
/// across sessions. Arguments arrive pre-validated against `parameters`;
/// results must be structured, serializable values.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Description offered to the model
    fn description(&self) -> &str;

    /// Announcement spoken to the caller before invocation
    fn announcement(&self) -> &str;

    /// JSON schema for arguments
    fn parameters(&self) -> Value;

    /// JSON schema for the result value
    fn returns(&self) -> Value;

    /// Execution deadline in seconds
    fn timeout_secs(&self) -> u64 {
        DEFAULT_TOOL_TIMEOUT_SECS
    }

    /// Invoke the tool with validated arguments
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;

    /// Full descriptor
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            say: self.announcement().to_string(),
            parameters: self.parameters(),
            returns: self.returns(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its arguments"
        }

        fn announcement(&self) -> &str {
            "One moment."
        }

        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        fn returns(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn test_schema_composition() {
        let tool = EchoTool;
        let schema = tool.schema();

        assert_eq!(schema.name, "echo");
        assert_eq!(schema.say, "One moment.");
        assert_eq!(tool.timeout_secs(), DEFAULT_TOOL_TIMEOUT_SECS);

        let out = tool.execute(serde_json::json!({"a": 1})).await.unwrap();
        assert_eq!(out["a"], 1);
    }
}
