//! Tool registry
//!
//! Maps tool names to statically registered handlers. Parameter schemas are
//! compiled at registration, so a catalog entry with an unusable schema
//! fails at startup instead of mid-call. Execution is bounded by each
//! tool's deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;

use call_agent_core::ToolDefinition;

use crate::catalog::{Tool, ToolError, ToolSchema};

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: JSONSchema,
}

/// Tool registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, compiling its parameter schema
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        self.register_boxed(Arc::new(tool))
    }

    /// Register a boxed tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        let parameters = tool.parameters();

        let validator = JSONSchema::compile(&parameters).map_err(|e| ToolError::InvalidSchema {
            tool: name.clone(),
            message: e.to_string(),
        })?;

        self.tools.insert(name, RegisteredTool { tool, validator });
        Ok(())
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

/// Tool executor trait
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name with schema validation and a deadline
    async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError>;

    /// List all descriptors
    fn list_tools(&self) -> Vec<ToolSchema>;

    /// Get one descriptor by name
    fn get_tool(&self, name: &str) -> Option<ToolSchema>;

    /// Catalog as offered to the model
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Announcement line for one tool
    fn announcement(&self, name: &str) -> Option<String>;
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if let Err(errors) = entry.validator.validate(&arguments) {
            let message = errors
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolError::InvalidArguments {
                tool: name.to_string(),
                message,
            });
        }

        let timeout_secs = entry.tool.timeout_secs();

        tracing::debug!(tool = name, timeout_secs, "executing tool");

        match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            entry.tool.execute(arguments),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(ToolError::Timeout {
                tool: name.to_string(),
                timeout_secs,
            }),
        }
    }

    fn list_tools(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.tool.schema()).collect()
    }

    fn get_tool(&self, name: &str) -> Option<ToolSchema> {
        self.tools.get(name).map(|t| t.tool.schema())
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| {
                ToolDefinition::new(
                    t.tool.name(),
                    t.tool.description(),
                    t.tool.parameters(),
                )
            })
            .collect()
    }

    fn announcement(&self, name: &str) -> Option<String> {
        self.tools
            .get(name)
            .map(|t| t.tool.announcement().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct SleepyTool;

    #[async_trait]
    impl Tool for SleepyTool {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn description(&self) -> &str {
            "Sleeps past its deadline"
        }

        fn announcement(&self) -> &str {
            "Hold on."
        }

        fn parameters(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        fn returns(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        fn timeout_secs(&self) -> u64 {
            1
        }

        async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    struct StrictTool;

    #[async_trait]
    impl Tool for StrictTool {
        fn name(&self) -> &str {
            "strict"
        }

        fn description(&self) -> &str {
            "Requires a mode argument"
        }

        fn announcement(&self) -> &str {
            "Checking."
        }

        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "mode": {"type": "string", "enum": ["basic", "comprehensive"]}
                },
                "required": ["mode"]
            })
        }

        fn returns(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
            Ok(serde_json::json!({"mode": arguments["mode"]}))
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_surfaces() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_argument_validation() {
        let mut registry = ToolRegistry::new();
        registry.register(StrictTool).unwrap();

        let err = registry
            .execute("strict", serde_json::json!({"mode": "deluxe"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let out = registry
            .execute("strict", serde_json::json!({"mode": "basic"}))
            .await
            .unwrap();
        assert_eq!(out["mode"], "basic");
    }

    #[tokio::test(start_paused = true)]
    async fn test_execution_deadline() {
        let mut registry = ToolRegistry::new();
        registry.register(SleepyTool).unwrap();

        let err = registry
            .execute("sleepy", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_definitions_for_model() {
        let mut registry = ToolRegistry::new();
        registry.register(StrictTool).unwrap();

        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "strict");
        assert_eq!(registry.announcement("strict").as_deref(), Some("Checking."));
    }

    #[test]
    fn test_bad_schema_fails_registration() {
        let mut registry = ToolRegistry::new();

        struct BrokenTool;

        #[async_trait]
        impl Tool for BrokenTool {
            fn name(&self) -> &str {
                "broken"
            }
            fn description(&self) -> &str {
                ""
            }
            fn announcement(&self) -> &str {
                ""
            }
            fn parameters(&self) -> Value {
                // "type" must be a string or array of strings
                serde_json::json!({"type": 42})
            }
            fn returns(&self) -> Value {
                Value::Null
            }
            async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
                Ok(Value::Null)
            }
        }

        assert!(matches!(
            registry.register(BrokenTool),
            Err(ToolError::InvalidSchema { .. })
        ));
    }
}
