//! Command Handlers
//!
//! Each handler writes user-facing output to `out`; diagnostics go through
//! `tracing` to stderr.

use std::io::Write;
use std::path::Path;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use agent_core::{StateUpdateEvent, TraceInterpreter};

use crate::record;
use crate::render;
use crate::state::AppState;

/// How a run is reported
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Stream reasoning, tool calls and tool results, then the final answer
    #[default]
    Trace,
    /// Print only the last message of the run
    Answer,
}

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

/// Answer one question
pub async fn ask<W: Write>(
    state: &AppState,
    question: &str,
    mode: Mode,
    out: &mut W,
) -> anyhow::Result<()> {
    let agent = state.agent();
    let mut events = agent.stream(question);

    let mut interpreter = TraceInterpreter::new();
    let mut last: Option<StateUpdateEvent> = None;

    while let Some(event) = events.next().await {
        let event = event?;

        if let Some(recorder) = &state.recorder {
            recorder.append(&event).await?;
        }

        if mode == Mode::Trace {
            for line in interpreter.observe(&event) {
                writeln!(out, "{}", render::line(&line))?;
            }
        }
        last = Some(event);
    }

    match mode {
        Mode::Trace => {
            if let Some(answer) = interpreter.finish() {
                writeln!(out, "{}", render::final_answer(&answer))?;
            }
        }
        Mode::Answer => {
            let text = last
                .as_ref()
                .and_then(StateUpdateEvent::last_message)
                .map(|m| m.text().to_string())
                .unwrap_or_default();
            writeln!(out, "{}", render::agent_response(&text))?;
        }
    }

    Ok(())
}

/// Interpret a recorded session
pub async fn replay<W: Write>(path: &Path, mode: Mode, out: &mut W) -> anyhow::Result<()> {
    let events = record::load_events(path).await?;
    tracing::info!(events = events.len(), "replaying session");
    write_replay(&events, mode, out)
}

fn write_replay<W: Write>(events: &[StateUpdateEvent], mode: Mode, out: &mut W) -> anyhow::Result<()> {
    match mode {
        Mode::Trace => {
            let transcript = TraceInterpreter::process(events);
            for line in &transcript.lines {
                writeln!(out, "{}", render::line(line))?;
            }
            if let Some(answer) = transcript.final_answer {
                writeln!(out, "{}", render::final_answer(&answer))?;
            }
        }
        Mode::Answer => {
            let text = events
                .last()
                .and_then(StateUpdateEvent::last_message)
                .map(|m| m.text())
                .unwrap_or_default();
            writeln!(out, "{}", render::agent_response(text))?;
        }
    }
    Ok(())
}

/// Report provider and backend status
pub async fn check<W: Write>(state: &AppState, out: &mut W) -> anyhow::Result<()> {
    let info = state.provider.info().await?;
    let healthy = state.provider.health_check().await.unwrap_or(false);

    writeln!(out, "Provider: {}", info.name)?;
    if let Some(endpoint) = &info.endpoint {
        writeln!(out, "  Endpoint: {}", endpoint)?;
    }
    writeln!(out, "  Reachable: {}", if healthy { "✓" } else { "✗" })?;
    writeln!(out, "  Model: {}", state.config.generation.model)?;
    writeln!(out, "  Available models: {}", info.models.len())?;
    for model in &info.models {
        writeln!(out, "    • {}", model.id)?;
    }

    writeln!(out, "Tools: {}", state.tools.names().join(", "))?;

    match &state.backend {
        Some(backend) => {
            let ok = backend.health_check().await;
            writeln!(out, "Backend: {} {}", backend.name(), if ok { "✓" } else { "✗" })?;
        }
        None => writeln!(out, "Backend: none")?,
    }

    Ok(())
}

/// Read-eval-print loop over stdin
pub async fn interactive(state: &AppState, mode: Mode) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("🤖 AI Agent with {} tool(s)", state.tools.len());
    println!("Ask questions about your database in natural language!");
    println!("Type 'exit' or 'quit' to end.\n");

    loop {
        print!("You: ");
        stdout.flush()?;

        let input = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(input) = input else {
            println!("\nGoodbye! 👋");
            break;
        };

        let input = input.trim();
        if is_exit(input) {
            println!("Goodbye! 👋");
            break;
        }
        if input.is_empty() {
            continue;
        }

        println!("{}", render::question_banner(input));

        tokio::select! {
            result = ask(state, input, mode, &mut stdout) => {
                if let Err(e) = result {
                    tracing::debug!(error = %e, "question failed");
                    println!("Error: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nGoodbye! 👋");
                break;
            }
        }
    }

    Ok(())
}

fn is_exit(input: &str) -> bool {
    EXIT_WORDS.contains(&input.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use agent_core::{
        AgentConfig, Message, Result, ToolCallRequest,
        provider::{Completion, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo},
        tool::ToolSchema,
    };
    use async_trait::async_trait;
    use clickhouse_tools::{MockQueryClient, QueryClient, QueryOutput, ResultFormat};
    use serde_json::json;

    use crate::state::{ToolChoice, ToolSetup};

    struct CannedProvider {
        replies: Mutex<VecDeque<Completion>>,
    }

    impl CannedProvider {
        fn new(replies: Vec<Completion>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "Canned".into(),
                endpoint: None,
                models: vec![ModelInfo {
                    id: "canned-1".into(),
                    owned_by: None,
                }],
                supports_tools: true,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Completion::text("done")))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    fn sql_state(replies: Vec<Completion>) -> AppState {
        let backend: Arc<dyn QueryClient> = Arc::new(MockQueryClient::new().with_result(
            "SELECT count() FROM events",
            QueryOutput::new(["count()"]).with_row(vec![json!("42")]),
        ));
        let setup = ToolSetup::new(ToolChoice::Clickhouse, Some(backend.clone()), ResultFormat::Table).unwrap();

        AppState {
            provider: Arc::new(CannedProvider::new(replies)),
            tools: Arc::new(setup.registry),
            backend: Some(backend),
            config: AgentConfig {
                system_prompt: setup.system_prompt.into(),
                ..Default::default()
            },
            recorder: None,
        }
    }

    fn count_query_script() -> Vec<Completion> {
        vec![
            Completion::with_tool_calls(
                "",
                vec![ToolCallRequest::new(
                    "query_clickhouse",
                    json!({"query": "SELECT count() FROM events"}),
                )],
            ),
            Completion::text("The events table has 42 rows."),
        ]
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_trace_mode_transcript() {
        let state = sql_state(count_query_script());
        let mut buf = Vec::new();

        ask(&state, "How many events?", Mode::Trace, &mut buf).await.unwrap();
        let text = output(buf);

        assert!(text.starts_with(
            "[Tool Call 1] query_clickhouse args={\"query\":\"SELECT count() FROM events\"}\n"
        ));
        assert!(text.contains("[Tool Result - query_clickhouse] Found 1 rows:"));
        assert!(text.contains("\n[Reasoning] The events table has 42 rows.\n"));
        assert!(text.ends_with("\n=== Final Answer ===\nThe events table has 42 rows.\n"));
        assert_eq!(text.matches("=== Final Answer ===").count(), 1);
    }

    #[tokio::test]
    async fn test_answer_mode_prints_last_message() {
        let state = sql_state(count_query_script());
        let mut buf = Vec::new();

        ask(&state, "How many events?", Mode::Answer, &mut buf).await.unwrap();

        assert_eq!(output(buf), "\nAgent Response:\nThe events table has 42 rows.\n\n");
    }

    #[tokio::test]
    async fn test_check_report() {
        let state = sql_state(Vec::new());
        let mut buf = Vec::new();

        check(&state, &mut buf).await.unwrap();
        let text = output(buf);

        assert!(text.contains("Provider: Canned"));
        assert!(text.contains("    • canned-1"));
        assert!(text.contains("Tools: query_clickhouse"));
        assert!(text.contains("Backend: MockClickHouse ✓"));
    }

    #[test]
    fn test_replay_without_final_answer() {
        let events = vec![
            StateUpdateEvent::new(
                "agent",
                vec![Message::reasoning_with_calls(
                    "Checking",
                    vec![ToolCallRequest::new("my_encoder", json!({"text": "x"}))],
                )],
            ),
            StateUpdateEvent::new("tools", vec![Message::tool_result("my_encoder", "xX")]),
        ];
        let mut buf = Vec::new();

        write_replay(&events, Mode::Trace, &mut buf).unwrap();

        assert_eq!(
            output(buf),
            "\n[Reasoning] Checking\n[Tool Call 1] my_encoder args={\"text\":\"x\"}\n[Tool Result - my_encoder] xX\n"
        );
    }

    #[test]
    fn test_replay_answer_mode_empty_log() {
        let mut buf = Vec::new();
        write_replay(&[], Mode::Answer, &mut buf).unwrap();
        assert_eq!(output(buf), "\nAgent Response:\n\n\n");
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(is_exit("q"));
        assert!(!is_exit("query"));
        assert!(!is_exit(""));
    }
}
