//! # agent-runtime
//!
//! Runtime providers for the sql-agent system.
//!
//! ## Providers
//!
//! - **OpenAI** (default): any server speaking the OpenAI chat-completions
//!   protocol with function calling. Point `OPENAI_BASE_URL` at
//!   `http://localhost:11434/v1` to run against a local Ollama.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentBuilder, AgentError, LlmProvider, Message, Result, StateUpdateEvent, Tool,
    ToolRegistry,
};
