//! # agent-core
//!
//! Core agent logic with provider-agnostic LLM abstraction, an extensible tool
//! system, and the session-trace interpreter that turns the agent's state
//! updates into a readable transcript.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐   │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │   │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │   │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘   │
//! └─────────┼────────────────────────────────────────────────────┘
//!           │ StateUpdateEvent stream
//!           ▼
//!   ┌─────────────────┐      TranscriptLine …, final answer
//!   │ TraceInterpreter│ ───────────────────────────────────────▶
//!   └─────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI, Ollama, or any
//! other chat-completions backend without changing agent logic.

pub mod provider;
pub mod tool;
pub mod reasoning;
pub mod message;
pub mod error;
pub mod trace;

pub use error::{AgentError, Result};
pub use message::{Message, StateUpdateEvent};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentBuilder, AgentConfig, EventStream};
pub use tool::{Tool, ToolCallRequest, ToolRegistry, ToolResult, ToolSchema};
pub use trace::{TraceInterpreter, Transcript, TranscriptLine};
