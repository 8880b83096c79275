//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM providers (OpenAI, Ollama, any
//! chat-completions compatible server) allowing the agent to work with any
//! backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = OpenAiProvider::from_env()?;
//! let completion = provider.complete(&messages, &tools, &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCallRequest, ToolSchema};

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "gpt-5-mini";

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-5-mini", "gpt-4o-mini", "llama3.2")
    pub model: String,

    /// Temperature for sampling; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Tool calls requested by the model, in order
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain text answer with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    /// Answer that requests tool calls
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: Some(FinishReason::ToolUse),
            ..Default::default()
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "OpenAI")
    pub name: String,

    /// Base URL of the API the provider talks to
    pub endpoint: Option<String>,

    /// Available models
    pub models: Vec<ModelInfo>,

    /// Whether tool/function calling is supported
    pub supports_tools: bool,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: Option<String>,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider information and capabilities
    async fn info(&self) -> Result<ProviderInfo>;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages, offering the given tools
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.model, "gpt-5-mini");
        assert!(opts.temperature.is_none());
        assert!(opts.max_tokens.is_none());
    }

    #[test]
    fn test_completion_constructors() {
        let done = Completion::text("42");
        assert!(done.tool_calls.is_empty());
        assert_eq!(done.finish_reason, Some(FinishReason::Stop));

        let call = ToolCallRequest::new("my_encoder", serde_json::json!({"text": "a"}));
        let pending = Completion::with_tool_calls("", vec![call]);
        assert_eq!(pending.tool_calls.len(), 1);
        assert_eq!(pending.finish_reason, Some(FinishReason::ToolUse));
    }
}
