//! sql-agent command line
//!
//! Asks an LLM agent questions about a ClickHouse database and prints its
//! reasoning trace: what it thought, which SQL it ran, what came back, and
//! the final answer.

mod handlers;
mod record;
mod render;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentConfig, provider::{DEFAULT_MODEL, GenerationOptions}};
use agent_runtime::{OpenAiConfig, OpenAiProvider};
use clickhouse_tools::{HttpQueryClient, MockQueryClient, QueryClient, ResultFormat};

use crate::handlers::Mode;
use crate::record::Recorder;
use crate::state::{AppState, ToolChoice, ToolSetup};

#[derive(Parser, Debug)]
#[command(name = "sql-agent", version, about = "Ask questions about your ClickHouse data in plain language")]
struct Cli {
    /// Question to ask the agent
    question: Option<String>,

    /// Tool set given to the agent
    #[arg(long, value_enum, env = "AGENT_TOOL", default_value = "clickhouse")]
    tool: ToolChoice,

    /// Show the full trace or only the last message
    #[arg(long, value_enum, default_value = "trace")]
    mode: Mode,

    /// Keep asking questions until exit
    #[arg(short, long)]
    interactive: bool,

    /// Interpret a recorded JSONL session instead of calling a model
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Append every event to a JSONL file
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Report provider and database status, then exit
    #[arg(long)]
    check: bool,

    /// Answer from built-in sample data instead of a ClickHouse server
    #[arg(long)]
    mock_db: bool,

    /// Model identifier
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Chat-completions base URL (e.g. http://localhost:11434/v1 for Ollama)
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Sampling temperature; provider default when unset
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum model calls per question
    #[arg(long, default_value_t = 25)]
    max_iterations: usize,

    /// How query results are shown to the model (json or table)
    #[arg(long, env = "CLICKHOUSE_RESULT_FORMAT", default_value = "json")]
    result_format: ResultFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before parsing so .env feeds the env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the transcript
    let filter = if cli.verbose {
        EnvFilter::new(default_directives(true))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(false)))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut stdout = std::io::stdout();

    if let Some(path) = &cli.replay {
        return handlers::replay(path, cli.mode, &mut stdout).await;
    }

    if cli.question.is_none() && !cli.interactive && !cli.check {
        println!("{}", render::usage());
        return Ok(());
    }

    let state = build_state(&cli).await?;

    if cli.check {
        return handlers::check(&state, &mut stdout).await;
    }

    if cli.interactive {
        return handlers::interactive(&state, cli.mode).await;
    }

    if let Some(question) = &cli.question {
        handlers::ask(&state, question, cli.mode, &mut stdout).await?;
    }

    Ok(())
}

/// Tool activity stays visible at the default level
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn,agent_core::tool=info"
    }
}

async fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    // Initialize LLM provider
    let mut provider_config = OpenAiConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        provider_config.base_url = base_url.clone();
    }
    let provider = Arc::new(OpenAiProvider::from_config(provider_config)?);

    // Initialize query backend for the SQL tool
    let backend: Option<Arc<dyn QueryClient>> = match cli.tool {
        ToolChoice::Clickhouse if cli.mock_db => Some(Arc::new(MockQueryClient::demo())),
        ToolChoice::Clickhouse => Some(Arc::new(HttpQueryClient::from_env()?)),
        ToolChoice::None | ToolChoice::Encoder => None,
    };

    let setup = ToolSetup::new(cli.tool, backend.clone(), cli.result_format)?;

    tracing::debug!("Registered {} tools:", setup.registry.len());
    for name in setup.registry.names() {
        tracing::debug!("  • {}", name);
    }

    let recorder = match &cli.record {
        Some(path) => Some(Arc::new(Recorder::open(path).await?)),
        None => None,
    };

    let config = AgentConfig {
        system_prompt: setup.system_prompt.into(),
        max_iterations: cli.max_iterations,
        generation: GenerationOptions {
            model: cli.model.clone(),
            temperature: cli.temperature,
            ..Default::default()
        },
    };

    Ok(AppState {
        provider,
        tools: Arc::new(setup.registry),
        backend,
        config,
        recorder,
    })
}
