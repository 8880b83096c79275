//! Mock Query Client
//!
//! For testing and offline demos. Serves canned results keyed by SQL text.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::QueryClient;
use crate::error::{QueryError, Result};
use crate::model::{Column, QueryOutput};

enum Canned {
    Rows(QueryOutput),
    Error { status: u16, message: String },
}

/// Mock client with canned results
#[derive(Default)]
pub struct MockQueryClient {
    canned: HashMap<String, Canned>,
    history: Mutex<Vec<String>>,
}

impl MockQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small `system.tables` fixture for demos without a server
    pub fn demo() -> Self {
        let tables = QueryOutput {
            columns: vec![
                Column::new("database").with_type("String"),
                Column::new("name").with_type("String"),
                Column::new("engine").with_type("String"),
                Column::new("total_rows").with_type("Nullable(UInt64)"),
            ],
            rows: vec![
                vec![json!("default"), json!("events"), json!("MergeTree"), json!("1024")],
                vec![json!("default"), json!("users"), json!("ReplacingMergeTree"), json!("87")],
                vec![json!("system"), json!("one"), json!("SystemOne"), serde_json::Value::Null],
            ],
        };

        Self::new()
            .with_result("SELECT database, name, engine, total_rows FROM system.tables", tables)
            .with_result(
                "SELECT count() FROM default.events",
                QueryOutput::new(["count()"]).with_row(vec![json!("1024")]),
            )
            .with_result("SELECT 1", QueryOutput::new(["1"]).with_row(vec![json!(1)]))
    }

    /// Register rows for a statement
    #[must_use]
    pub fn with_result(mut self, sql: &str, output: QueryOutput) -> Self {
        self.canned.insert(normalize(sql), Canned::Rows(output));
        self
    }

    /// Register a server error for a statement
    #[must_use]
    pub fn with_error(mut self, sql: &str, status: u16, message: impl Into<String>) -> Self {
        self.canned.insert(
            normalize(sql),
            Canned::Error {
                status,
                message: message.into(),
            },
        );
        self
    }

    /// Statements executed so far, in order
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }
}

/// Collapse whitespace and drop a trailing semicolon
fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .trim_end()
        .to_string()
}

#[async_trait]
impl QueryClient for MockQueryClient {
    async fn query(&self, sql: &str) -> Result<QueryOutput> {
        let key = normalize(sql);
        if let Ok(mut history) = self.history.lock() {
            history.push(key.clone());
        }

        match self.canned.get(&key) {
            Some(Canned::Rows(output)) => Ok(output.clone()),
            Some(Canned::Error { status, message }) => Err(QueryError::Server {
                status: *status,
                message: message.clone(),
            }),
            None => Err(QueryError::UnknownQuery(key)),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "MockClickHouse"
    }
}
