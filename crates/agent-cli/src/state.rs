//! Application State

use std::sync::Arc;

use agent_core::{
    Agent, AgentConfig, LlmProvider, ToolRegistry, reasoning::DEFAULT_SYSTEM_PROMPT,
    tool::EncoderTool,
};
use clickhouse_tools::{
    DATABASE_ASSISTANT_PROMPT, QueryClient, ResultFormat, tools::QueryClickHouseTool,
};

use crate::record::Recorder;

/// Which tool the agent is given
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ToolChoice {
    /// No tools: plain chat
    None,
    /// The `my_encoder` demo tool
    Encoder,
    /// SQL against ClickHouse
    Clickhouse,
}

/// Tools plus the system prompt that goes with them
pub struct ToolSetup {
    pub registry: ToolRegistry,
    pub system_prompt: &'static str,
}

impl ToolSetup {
    pub fn new(
        choice: ToolChoice,
        backend: Option<Arc<dyn QueryClient>>,
        format: ResultFormat,
    ) -> anyhow::Result<Self> {
        let mut registry = ToolRegistry::new();

        let system_prompt = match choice {
            ToolChoice::None => DEFAULT_SYSTEM_PROMPT,
            ToolChoice::Encoder => {
                registry.register(EncoderTool);
                DEFAULT_SYSTEM_PROMPT
            }
            ToolChoice::Clickhouse => {
                let backend = backend
                    .ok_or_else(|| anyhow::anyhow!("the clickhouse tool needs a query backend"))?;
                registry.register(QueryClickHouseTool::new(backend).with_format(format));
                DATABASE_ASSISTANT_PROMPT
            }
        };

        Ok(Self {
            registry,
            system_prompt,
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (OpenAI-compatible)
    pub provider: Arc<dyn LlmProvider>,

    /// Tool registry for the selected tool set
    pub tools: Arc<ToolRegistry>,

    /// Query backend, when the ClickHouse tool is in use
    pub backend: Option<Arc<dyn QueryClient>>,

    pub config: AgentConfig,

    /// Session recorder (optional - None unless --record is given)
    pub recorder: Option<Arc<Recorder>>,
}

impl AppState {
    /// A fresh agent for one question
    pub fn agent(&self) -> Agent {
        Agent::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.tools),
            self.config.clone(),
        )
    }
}
