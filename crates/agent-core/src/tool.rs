//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered at runtime and invoked by the reasoning loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Optional call ID for tracking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool identifier
    pub name: String,

    /// Arguments, normally an object of key-value pairs
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Look up a string argument
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    fn has_arg(&self, key: &str) -> bool {
        self.arguments.get(key).is_some_and(|v| !v.is_null())
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    /// Required string parameter
    pub fn required_string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: "string".into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// JSON Schema object describing the parameters
    pub fn parameters_json_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|param| {
                let mut schema = serde_json::Map::new();
                schema.insert("type".into(), serde_json::Value::String(param.param_type.clone()));
                schema.insert(
                    "description".into(),
                    serde_json::Value::String(param.description.clone()),
                );
                (param.name.clone(), serde_json::Value::Object(schema))
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCallRequest) -> Result<ToolResult>;

    /// Validate arguments before execution (optional)
    fn validate(&self, call: &ToolCallRequest) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !call.has_arg(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.schema();
        self.tools.insert(schema.name.clone(), Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCallRequest) -> Result<ToolResult> {
        let tool = self.get(&call.name).ok_or_else(|| {
            AgentError::ToolNotFound(call.name.clone())
        })?;

        tool.validate(call)?;

        tool.execute(call).await
    }

    /// All tool schemas, sorted by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Encoder tool - echoes the text followed by its upper-cased form
pub struct EncoderTool;

#[async_trait]
impl Tool for EncoderTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "my_encoder".into(),
            description: "A simple text encoder tool.".into(),
            parameters: vec![ParameterSchema::required_string("text", "Text to encode")],
        }
    }

    async fn execute(&self, call: &ToolCallRequest) -> Result<ToolResult> {
        let text = call
            .str_arg("text")
            .ok_or_else(|| AgentError::ToolValidation("Missing text".into()))?;

        tracing::info!("Tool called with input: {}", text);

        Ok(ToolResult::success("my_encoder", encode(text)))
    }
}

fn encode(text: &str) -> String {
    format!("{}{}", text, text.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode("abc"), "abcABC");
        assert_eq!(encode(""), "");
    }

    #[test]
    fn test_tool_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(EncoderTool);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["my_encoder"]);
        assert!(registry.get("my_encoder").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[tokio::test]
    async fn test_registry_executes_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EncoderTool);

        let call = ToolCallRequest::new("my_encoder", serde_json::json!({"text": "hi"}));
        let result = registry.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hiHI");
    }

    #[tokio::test]
    async fn test_registry_rejects_missing_parameter() {
        let mut registry = ToolRegistry::new();
        registry.register(EncoderTool);

        let call = ToolCallRequest::new("my_encoder", serde_json::json!({}));
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCallRequest::new("drop_tables", serde_json::json!({}));
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "drop_tables"));
    }

    #[test]
    fn test_parameters_json_schema() {
        let schema = EncoderTool.schema().parameters_json_schema();
        assert_eq!(
            schema,
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Text to encode"}
                },
                "required": ["text"],
            })
        );
    }
}
