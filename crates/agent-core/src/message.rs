//! Conversation Messages
//!
//! The message model shared by the reasoning loop, the providers and the
//! trace interpreter, plus the state-update event the loop emits.

use serde::{Deserialize, Deserializer, Serialize};

use crate::tool::ToolCallRequest;

/// A single message in an agent run.
///
/// The set of kinds is closed; anything the decoder does not recognise
/// becomes [`Message::Unknown`] instead of failing the surrounding event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// System instruction
    System {
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
    },

    /// User question
    User {
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
    },

    /// Model output: reasoning text and any tool calls it requests
    Reasoning {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
        #[serde(
            default,
            deserialize_with = "null_as_default",
            skip_serializing_if = "Vec::is_empty"
        )]
        tool_calls: Vec<ToolCallRequest>,
    },

    /// Output of a tool execution, answering an earlier tool call
    ToolResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
    },

    /// A message kind this crate does not model
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { content: content.into() }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Message::User { content: content.into() }
    }

    /// Create a reasoning message without tool calls
    pub fn reasoning(text: impl Into<String>) -> Self {
        Message::Reasoning {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create a reasoning message that requests tool calls
    pub fn reasoning_with_calls(text: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Message::Reasoning {
            text: text.into(),
            tool_calls,
        }
    }

    /// Create a tool result message
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Message::ToolResult {
            tool_name: Some(tool_name.into()),
            tool_call_id: None,
            content: content.into(),
        }
    }

    /// Attach the id of the tool call this result answers
    #[must_use]
    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        if let Message::ToolResult { tool_call_id, .. } = &mut self {
            *tool_call_id = Some(id.into());
        }
        self
    }

    /// Text body of the message
    pub fn text(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::ToolResult { content, .. } => content,
            Message::Reasoning { text, .. } => text,
            Message::Unknown => "",
        }
    }
}

/// Name of the stage that calls the model
pub const AGENT_NODE: &str = "agent";

/// Name of the stage that executes tools
pub const TOOLS_NODE: &str = "tools";

/// One incremental update from the reasoning loop.
///
/// `messages` is the full running history at the time of the update, so
/// consumers only need the last element of each event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdateEvent {
    /// Stage that produced the update
    #[serde(default)]
    pub node: String,

    /// History snapshot
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Vec<Message>,
}

impl StateUpdateEvent {
    pub fn new(node: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            node: node.into(),
            messages,
        }
    }

    /// The newest message of the snapshot
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Read an explicit JSON `null` as the field's default
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode each message on its own so one malformed entry cannot sink the event.
fn lenient_messages<'de, D>(deserializer: D) -> std::result::Result<Vec<Message>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;

    Ok(raw
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::debug!(%err, "undecodable message replaced with Unknown");
                Message::Unknown
            })
        })
        .collect())
}
