//! Query Tool
//!
//! Executes model-written SQL against ClickHouse and returns the rows as text.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    Result as CoreResult, Tool, ToolCallRequest, ToolResult, ToolSchema,
    tool::ParameterSchema,
};

use crate::client::QueryClient;
use crate::model::ResultFormat;

const TOOL_NAME: &str = "query_clickhouse";

/// Returned when a statement succeeds without producing rows
pub const NO_RESULTS_MESSAGE: &str = "Query executed successfully but returned no results.";

/// Tool for running SQL against ClickHouse
pub struct QueryClickHouseTool {
    client: Arc<dyn QueryClient>,
    format: ResultFormat,
}

impl QueryClickHouseTool {
    pub fn new(client: Arc<dyn QueryClient>) -> Self {
        Self {
            client,
            format: ResultFormat::default(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: ResultFormat) -> Self {
        self.format = format;
        self
    }

    /// Run one statement; errors become text rather than propagating
    pub async fn run(&self, sql: &str) -> ToolResult {
        tracing::info!(client = self.client.name(), sql = %sql, "Executing query");

        match self.client.query(sql).await {
            Ok(output) if output.is_empty() => ToolResult::success(TOOL_NAME, NO_RESULTS_MESSAGE),
            Ok(output) => {
                tracing::debug!(rows = output.row_count(), "Query returned rows");
                ToolResult::success(TOOL_NAME, output.render(self.format))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query failed");
                ToolResult::failure(TOOL_NAME, format!("Error executing query: {}", e))
            }
        }
    }
}

#[async_trait]
impl Tool for QueryClickHouseTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: TOOL_NAME.into(),
            description: "Execute a SQL query against ClickHouse database. \
                Use this tool when you need to retrieve data from the database. \
                Returns query results as a formatted string."
                .into(),
            parameters: vec![ParameterSchema::required_string(
                "query",
                "A valid ClickHouse SQL query string",
            )],
        }
    }

    async fn execute(&self, call: &ToolCallRequest) -> CoreResult<ToolResult> {
        let result = match call.str_arg("query") {
            Some(sql) => self.run(sql).await,
            None => ToolResult::failure(
                TOOL_NAME,
                "Error executing query: missing string argument 'query'",
            ),
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockQueryClient;
    use crate::model::QueryOutput;
    use agent_core::ToolRegistry;
    use serde_json::json;

    fn tool(client: MockQueryClient) -> QueryClickHouseTool {
        QueryClickHouseTool::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_rows_rendered_as_json() {
        let client = MockQueryClient::new().with_result(
            "SELECT name FROM system.databases",
            QueryOutput::new(["name"])
                .with_row(vec![json!("default")])
                .with_row(vec![json!("system")]),
        );

        let call = ToolCallRequest::new(
            "query_clickhouse",
            json!({"query": "SELECT name FROM system.databases"}),
        );
        let result = tool(client).execute(&call).await.unwrap();

        assert!(result.success);
        let parsed: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed, json!([{"name": "default"}, {"name": "system"}]));
    }

    #[tokio::test]
    async fn test_rows_rendered_as_table() {
        let result = tool(MockQueryClient::demo())
            .with_format(ResultFormat::Table)
            .run("SELECT 1")
            .await;

        assert!(result.output.starts_with("Found 1 rows:\n\n1\n---------------\n1\n"));
    }

    #[tokio::test]
    async fn test_empty_result() {
        let client = MockQueryClient::new().with_result(
            "CREATE TABLE t (x UInt8) ENGINE = Memory",
            QueryOutput::default(),
        );
        let result = tool(client)
            .run("CREATE TABLE t (x UInt8) ENGINE = Memory")
            .await;

        assert!(result.success);
        assert_eq!(result.output, NO_RESULTS_MESSAGE);
    }

    #[tokio::test]
    async fn test_error_becomes_text() {
        let client = MockQueryClient::new().with_error(
            "SELEC 1",
            400,
            "Code: 62. DB::Exception: Syntax error",
        );
        let call = ToolCallRequest::new("query_clickhouse", json!({"query": "SELEC 1"}));
        let result = tool(client).execute(&call).await.unwrap();

        assert!(!result.success);
        assert_eq!(
            result.output,
            "Error executing query: ClickHouse returned 400: Code: 62. DB::Exception: Syntax error"
        );
    }

    #[tokio::test]
    async fn test_registry_validates_query_argument() {
        let mut registry = ToolRegistry::new();
        registry.register(tool(MockQueryClient::demo()));

        let call = ToolCallRequest::new("query_clickhouse", json!({}));
        assert!(registry.execute(&call).await.is_err());

        let call = ToolCallRequest::new("query_clickhouse", json!({"query": "SELECT 1"}));
        assert!(registry.execute(&call).await.unwrap().success);
    }

    #[test]
    fn test_schema() {
        let schema = tool(MockQueryClient::new()).schema();
        assert_eq!(schema.name, "query_clickhouse");
        assert_eq!(schema.parameters_json_schema()["required"], json!(["query"]));
    }
}
