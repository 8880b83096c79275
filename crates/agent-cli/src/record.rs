//! Session Recording
//!
//! Live events can be appended to a JSON Lines file and replayed later
//! through the same interpreter without calling a model.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use agent_core::StateUpdateEvent;

/// One line of a recorded session
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub recorded_at: DateTime<Utc>,

    #[serde(flatten)]
    pub event: StateUpdateEvent,
}

/// Appends events to a JSONL file
pub struct Recorder {
    file: Mutex<File>,
}

impl Recorder {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("cannot open record file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "recording session");

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub async fn append(&self, event: &StateUpdateEvent) -> anyhow::Result<()> {
        let record = RecordedEvent {
            recorded_at: Utc::now(),
            event: event.clone(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Parse a JSONL event log. Blank lines are ignored and malformed lines
/// are skipped with a warning.
pub fn parse_events(contents: &str) -> Vec<StateUpdateEvent> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str::<StateUpdateEvent>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(line = i + 1, error = %e, "skipping malformed event");
                None
            }
        })
        .collect()
}

pub async fn load_events(path: &Path) -> anyhow::Result<Vec<StateUpdateEvent>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read replay file {}", path.display()))?;

    Ok(parse_events(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Message;

    #[test]
    fn test_parse_skips_malformed_lines() {
        let log = concat!(
            r#"{"node":"agent","messages":[{"type":"user","content":"hi"},{"type":"reasoning","text":"hello"}]}"#,
            "\n\n",
            "not json at all\n",
            r#"{"node":"tools","messages":[{"type":"tool_result","tool_name":"my_encoder","content":"xX"}]}"#,
            "\n",
        );

        let events = parse_events(log);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].last_message(), Some(&Message::reasoning("hello")));
        assert_eq!(events[1].node, "tools");
    }

    #[tokio::test]
    async fn test_record_then_load() {
        let path = std::env::temp_dir().join(format!("sql-agent-{}.jsonl", uuid::Uuid::new_v4()));

        let recorder = Recorder::open(&path).await.unwrap();
        let first = StateUpdateEvent::new("agent", vec![Message::user("q"), Message::reasoning("a")]);
        recorder.append(&first).await.unwrap();
        recorder.append(&StateUpdateEvent::default()).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.lines().all(|l| l.contains("\"recorded_at\"")));

        let events = load_events(&path).await.unwrap();
        assert_eq!(events, vec![first, StateUpdateEvent::default()]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_replay_file() {
        let err = load_events(Path::new("/definitely/not/here.jsonl")).await.unwrap_err();
        assert!(err.to_string().contains("cannot read replay file"));
    }
}
