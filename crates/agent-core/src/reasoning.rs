//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern for agent behavior.
//! The agent thinks, acts (via tools), observes the results and responds.
//!
//! Each step is published as a [`StateUpdateEvent`] carrying the full
//! history so far, which is what the trace interpreter consumes.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{AgentError, Result};
use crate::message::{AGENT_NODE, Message, StateUpdateEvent, TOOLS_NODE};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCallRequest, ToolRegistry, ToolResult};

/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Buffered updates between the loop task and its consumer
const EVENT_BUFFER: usize = 16;

/// Stream of state updates from one agent run
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StateUpdateEvent>> + Send>>;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt
    pub system_prompt: String,

    /// Maximum model calls before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 25,
            generation: GenerationOptions::default(),
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Start a run and return its update stream.
    ///
    /// The loop runs on a spawned task and stops at its next update once the
    /// stream is dropped. An error, if any, is the last item.
    pub fn stream(&self, question: &str) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let run = Run {
            provider: Arc::clone(&self.provider),
            tools: Arc::clone(&self.tools),
            config: self.config.clone(),
            messages: vec![
                Message::system(self.config.system_prompt.clone()),
                Message::user(question),
            ],
            tx,
        };

        tokio::spawn(run.drive());

        Box::pin(ReceiverStream::new(rx))
    }

    /// Run to completion and return the final history
    pub async fn invoke(&self, question: &str) -> Result<Vec<Message>> {
        let mut events = self.stream(question);
        let mut last = None;

        while let Some(event) = events.next().await {
            last = Some(event?);
        }

        Ok(last.map(|event| event.messages).unwrap_or_default())
    }

    /// Run to completion and return the text of the last message
    pub async fn ask(&self, question: &str) -> Result<String> {
        let messages = self.invoke(question).await?;
        Ok(messages.last().map(|m| m.text().to_string()).unwrap_or_default())
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// State owned by one running loop
struct Run {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    messages: Vec<Message>,
    tx: mpsc::Sender<Result<StateUpdateEvent>>,
}

impl Run {
    async fn drive(mut self) {
        if let Err(err) = self.run().await {
            tracing::warn!(error = %err, "agent run failed");
            let _ = self.tx.send(Err(err)).await;
        }
    }

    async fn run(&mut self) -> Result<()> {
        let schemas = self.tools.schemas();

        for iteration in 1..=self.config.max_iterations {
            tracing::debug!(iteration, model = %self.config.generation.model, "calling model");

            let completion = self
                .provider
                .complete(&self.messages, &schemas, &self.config.generation)
                .await?;

            if let Some(usage) = &completion.usage {
                tracing::debug!(
                    prompt = usage.prompt_tokens,
                    completion = usage.completion_tokens,
                    "token usage"
                );
            }

            let mut calls = completion.tool_calls;
            for call in &mut calls {
                call.id.get_or_insert_with(|| uuid::Uuid::new_v4().to_string());
            }

            self.messages
                .push(Message::reasoning_with_calls(completion.content, calls.clone()));
            if !self.emit(AGENT_NODE).await {
                return Ok(());
            }

            if calls.is_empty() {
                return Ok(());
            }

            let results = futures::future::join_all(
                calls.iter().map(|call| execute_tool(&self.tools, call)),
            )
            .await;

            for result in results {
                let mut message = Message::tool_result(result.name, result.output);
                if let Some(id) = result.id {
                    message = message.with_call_id(id);
                }
                self.messages.push(message);
            }
            if !self.emit(TOOLS_NODE).await {
                return Ok(());
            }
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }

    /// Publish the current snapshot; false once the consumer has gone away
    async fn emit(&self, node: &str) -> bool {
        let event = StateUpdateEvent::new(node, self.messages.clone());
        if self.tx.send(Ok(event)).await.is_err() {
            tracing::debug!(node, "consumer dropped, stopping run");
            return false;
        }
        true
    }
}

/// Execute a tool call; failures become error text for the model to read
async fn execute_tool(tools: &ToolRegistry, call: &ToolCallRequest) -> ToolResult {
    tracing::debug!(tool = %call.name, "Executing tool");

    match tools.execute(call).await {
        Ok(result) => result.with_id(call.id.clone()),
        Err(e) => {
            tracing::warn!(tool = %call.name, error = %e, "tool call failed");
            ToolResult::failure(call.name.clone(), format!("Error: {}", e)).with_id(call.id.clone())
        }
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: Option<f32>) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self.provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}
