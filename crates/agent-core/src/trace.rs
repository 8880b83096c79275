//! Session Trace Interpreter
//!
//! Turns the reasoning loop's stream of state snapshots into a readable
//! transcript and picks the message to report as the final answer.
//!
//! Every event carries the whole running history, so only its last message
//! is looked at. Nothing here can fail: unknown or malformed messages are
//! skipped and arguments that cannot be rendered fall back to a raw form.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

use crate::message::{Message, StateUpdateEvent};
use crate::tool::ToolCallRequest;

/// Name shown for tool results that do not carry one
pub const DEFAULT_TOOL_NAME: &str = "tool";

/// One line of the transcript
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptLine {
    /// Text written by the model
    Reasoning { text: String },

    /// A tool call requested by the model, numbered from 1 within its message
    ToolCallAnnounced {
        index: usize,
        name: String,
        arguments: String,
    },

    /// Output returned by a tool
    ToolResult { tool_name: String, content: String },
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptLine::Reasoning { text } => write!(f, "[Reasoning] {text}"),
            TranscriptLine::ToolCallAnnounced { index, name, arguments } => {
                write!(f, "[Tool Call {index}] {name} args={arguments}")
            }
            TranscriptLine::ToolResult { tool_name, content } => {
                write!(f, "[Tool Result - {tool_name}] {content}")
            }
        }
    }
}

/// Result of interpreting a complete stream
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub lines: Vec<TranscriptLine>,
    pub final_answer: Option<String>,
}

/// Incremental interpreter state for one question.
///
/// Feed events with [`observe`](Self::observe) as they arrive and call
/// [`finish`](Self::finish) once the stream is exhausted.
#[derive(Debug, Default)]
pub struct TraceInterpreter {
    final_answer: Option<String>,
    events_seen: usize,
}

impl TraceInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret a fully materialized sequence of events.
    pub fn process<I>(events: I) -> Transcript
    where
        I: IntoIterator,
        I::Item: Borrow<StateUpdateEvent>,
    {
        let mut interpreter = Self::new();
        let lines = events
            .into_iter()
            .flat_map(|event| interpreter.observe(event.borrow()))
            .collect();

        Transcript {
            lines,
            final_answer: interpreter.finish(),
        }
    }

    /// Classify one event and return the lines it produces, in order.
    pub fn observe(&mut self, event: &StateUpdateEvent) -> Vec<TranscriptLine> {
        self.events_seen += 1;

        let Some(last) = event.last_message() else {
            tracing::trace!(node = %event.node, "event without messages skipped");
            return Vec::new();
        };

        match last {
            Message::Reasoning { text, tool_calls } => self.observe_reasoning(text, tool_calls),
            Message::ToolResult { tool_name, content, .. } => vec![TranscriptLine::ToolResult {
                tool_name: tool_name
                    .as_deref()
                    .unwrap_or(DEFAULT_TOOL_NAME)
                    .to_string(),
                content: content.clone(),
            }],
            Message::System { .. } | Message::User { .. } | Message::Unknown => {
                tracing::trace!(node = %event.node, "message kind ignored");
                Vec::new()
            }
        }
    }

    fn observe_reasoning(&mut self, text: &str, tool_calls: &[ToolCallRequest]) -> Vec<TranscriptLine> {
        let mut lines = Vec::with_capacity(tool_calls.len() + 1);

        if !text.is_empty() {
            lines.push(TranscriptLine::Reasoning { text: text.to_string() });
        }

        if tool_calls.is_empty() {
            self.final_answer = Some(text.to_string());
        } else {
            lines.extend(tool_calls.iter().enumerate().map(|(i, call)| {
                TranscriptLine::ToolCallAnnounced {
                    index: i + 1,
                    name: call.name.clone(),
                    arguments: render_arguments(&call.arguments),
                }
            }));
        }

        lines
    }

    /// Current final-answer candidate
    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    /// Number of events observed so far, including skipped ones
    pub fn events_seen(&self) -> usize {
        self.events_seen
    }

    /// Consume the interpreter and return the final answer, if any.
    ///
    /// An empty candidate counts as no answer.
    pub fn finish(self) -> Option<String> {
        tracing::debug!(events = self.events_seen, "trace finished");
        self.final_answer.filter(|answer| !answer.is_empty())
    }
}

/// Render tool arguments as compact JSON, falling back to the debug form.
pub fn render_arguments(arguments: &serde_json::Value) -> String {
    serde_json::to_string(arguments).unwrap_or_else(|err| {
        tracing::debug!(%err, "tool arguments rendered raw");
        format!("{arguments:?}")
    })
}
