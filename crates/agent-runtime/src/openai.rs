//! OpenAI-compatible LLM Provider
//!
//! Implementation of `LlmProvider` for the chat-completions API with native
//! function calling. Works against OpenAI and compatible servers (Ollama's
//! `/v1` endpoint, vLLM, LiteLLM).

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{
        Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo,
        TokenUsage,
    },
    tool::{ToolCallRequest, ToolSchema},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key, optional for local servers
    pub api_key: Option<String>,

    /// Base URL including the version prefix
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(120);

        Self {
            api_key,
            base_url,
            timeout_secs,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// OpenAI chat-completions provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from configuration
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_none() && config.base_url == DEFAULT_BASE_URL {
            return Err(AgentError::Config(
                "OPENAI_API_KEY is not set (required for api.openai.com)".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env())
    }

    /// Convert agent messages to chat-completions format
    fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .filter_map(|m| match m {
                Message::System { content } => Some(serde_json::json!({
                    "role": "system",
                    "content": content,
                })),
                Message::User { content } => Some(serde_json::json!({
                    "role": "user",
                    "content": content,
                })),
                Message::Reasoning { text, tool_calls } => {
                    let mut msg = serde_json::json!({
                        "role": "assistant",
                        "content": text,
                    });
                    if !tool_calls.is_empty() {
                        let calls: Vec<serde_json::Value> = tool_calls
                            .iter()
                            .map(|call| {
                                serde_json::json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": encode_arguments(&call.arguments),
                                    }
                                })
                            })
                            .collect();
                        msg["tool_calls"] = serde_json::Value::Array(calls);
                    }
                    Some(msg)
                }
                Message::ToolResult { tool_call_id, content, .. } => Some(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "content": content,
                })),
                Message::Unknown => None,
            })
            .collect()
    }

    /// Convert tool schemas to function definitions
    fn convert_tools(tools: &[ToolSchema]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_json_schema(),
                    }
                })
            })
            .collect()
    }

    /// Build the request body
    fn build_body(
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": options.model,
            "messages": Self::convert_messages(messages),
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(Self::convert_tools(tools));
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn post_once(&self, body: &serde_json::Value) -> Result<ChatResponse> {
        let response = self
            .authorized(self.client.post(self.config.endpoint("chat/completions")))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, text));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "OpenAI".into(),
            endpoint: Some(self.config.base_url.clone()),
            models,
            supports_tools: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let body = Self::build_body(messages, tools, options);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.post_once(&body).await {
                Ok(response) => return convert_completion(response, &options.model),
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                    tracing::warn!(attempt, backoff_ms = backoff, error = %e, "retrying completion");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .authorized(self.client.get(self.config.endpoint("models")))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, text));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
            })
            .collect())
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
    #[serde(default)]
    owned_by: Option<String>,
}

/// Convert a chat response to an agent completion
fn convert_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::Parse("No choices in response".into()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| ToolCallRequest {
            id: tc.id.filter(|id| !id.is_empty()),
            name: tc.function.name,
            arguments: decode_arguments(&tc.function.arguments),
        })
        .collect();

    let finish_reason = choice.finish_reason.as_deref().map(|reason| match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolUse,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Error,
    });

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        model: response.model.unwrap_or_else(|| requested_model.to_string()),
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        finish_reason,
    })
}

/// Parse an arguments string, keeping it raw when it is not JSON
fn decode_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| {
        tracing::debug!(arguments = %raw, "tool arguments are not JSON, keeping raw string");
        serde_json::Value::String(raw.to_string())
    })
}

/// Arguments travel as a JSON-encoded string; raw strings go back unchanged
fn encode_arguments(arguments: &serde_json::Value) -> String {
    match arguments {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

fn transport_error(err: reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

fn status_error(status: StatusCode, body: String) -> AgentError {
    let message = format!("{}: {}", status, body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(message),
        s if s.is_server_error() => AgentError::ProviderUnavailable(message),
        _ => AgentError::Provider(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.endpoint("models"), "https://api.openai.com/v1/models");
    }

    #[test]
    fn test_missing_key_rejected_for_openai() {
        let err = OpenAiProvider::from_config(OpenAiConfig::default()).err().unwrap();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_local_server_needs_no_key() {
        let config = OpenAiConfig {
            base_url: "http://localhost:11434/v1/".into(),
            ..Default::default()
        };
        assert_eq!(config.endpoint("chat/completions"), "http://localhost:11434/v1/chat/completions");
        assert!(OpenAiProvider::from_config(config).is_ok());
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Count rows"),
            Message::reasoning_with_calls(
                "",
                vec![ToolCallRequest::new(
                    "query_clickhouse",
                    serde_json::json!({"query": "SELECT count() FROM t"}),
                )
                .with_id("call_1")],
            ),
            Message::tool_result("query_clickhouse", "[{\"count()\": 3}]").with_call_id("call_1"),
            Message::Unknown,
        ];

        let converted = OpenAiProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[0]["role"], "system");
        assert_eq!(converted[2]["role"], "assistant");
        assert_eq!(converted[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            converted[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"SELECT count() FROM t"}"#
        );
        assert_eq!(converted[3]["role"], "tool");
        assert_eq!(converted[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_body_omits_unset_sampling() {
        let options = GenerationOptions::default();
        let body = OpenAiProvider::build_body(&[Message::user("hi")], &[], &options);
        assert_eq!(body["model"], "gpt-5-mini");
        assert!(body.get("temperature").is_none());
        assert!(body.get("tools").is_none());

        let options = GenerationOptions {
            temperature: Some(0.0),
            ..Default::default()
        };
        let body = OpenAiProvider::build_body(&[Message::user("hi")], &[], &options);
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = r#"{
            "model": "gpt-5-mini-2025-08-07",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function",
                         "function": {"name": "query_clickhouse", "arguments": "{\"query\":\"SELECT 1\"}"}},
                        {"id": "call_b", "type": "function",
                         "function": {"name": "query_clickhouse", "arguments": "SELECT 2"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let completion = convert_completion(response, "gpt-5-mini").unwrap();

        assert_eq!(completion.content, "");
        assert_eq!(completion.model, "gpt-5-mini-2025-08-07");
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(completion.tool_calls.len(), 2);
        assert_eq!(completion.tool_calls[0].arguments["query"], "SELECT 1");
        assert_eq!(completion.tool_calls[1].arguments, serde_json::json!("SELECT 2"));
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_text_response() {
        let raw = r#"{"choices": [{"message": {"content": "There are 3 rows."}, "finish_reason": "stop"}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let completion = convert_completion(response, "gpt-4o-mini").unwrap();

        assert_eq!(completion.content, "There are 3 rows.");
        assert!(completion.tool_calls.is_empty());
        assert_eq!(completion.model, "gpt-4o-mini");
    }

    #[test]
    fn test_empty_choices_is_parse_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(convert_completion(response, "m"), Err(AgentError::Parse(_))));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, String::new()), AgentError::Auth(_)));
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        assert!(status_error(StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad model".into()),
            AgentError::Provider(msg) if msg.contains("bad model")
        ));
    }

    #[test]
    fn test_arguments_encoding() {
        assert_eq!(encode_arguments(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(encode_arguments(&serde_json::json!("raw text")), "raw text");
        assert_eq!(decode_arguments(""), serde_json::json!({}));
    }
}
