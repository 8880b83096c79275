//! Domain Models
//!
//! Query results as returned by ClickHouse's `JSON` output format, and the
//! two textual renderings the tool hands back to the model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{QueryError, Result};

/// Maximum rows shown by the table rendering
pub const TABLE_ROW_LIMIT: usize = 10;

/// Width of the header rule, per column
const RULE_WIDTH_PER_COLUMN: usize = 15;

/// A result column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// ClickHouse type name (e.g., "UInt64", "Nullable(String)")
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: String::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }
}

/// Rows returned by a query, cells kept in column order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

/// Body of a `FORMAT JSON` response
#[derive(Deserialize)]
struct JsonBody {
    #[serde(default)]
    meta: Vec<Column>,
    #[serde(default)]
    data: Vec<Map<String, Value>>,
}

impl QueryOutput {
    /// Empty result with the given column names
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Column::new).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Parse a ClickHouse `JSON` format response body.
    ///
    /// Statements that produce no result set (DDL, INSERT) return an empty
    /// body, which parses to an empty output.
    pub fn from_json_body(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }

        let parsed: JsonBody = serde_json::from_str(body)?;

        if parsed.meta.is_empty() && !parsed.data.is_empty() {
            return Err(QueryError::MalformedResult(
                "rows present without column metadata".into(),
            ));
        }

        let rows = parsed
            .data
            .into_iter()
            .map(|mut record| {
                parsed
                    .meta
                    .iter()
                    .map(|col| record.remove(&col.name).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self {
            columns: parsed.meta,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Rows as column→value objects, keys in column order
    pub fn to_json_records(&self) -> Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, cell)| (col.name.clone(), cell.clone()))
                    .collect();
                Value::Object(record)
            })
            .collect();

        Value::Array(records)
    }

    /// Pretty-printed JSON array of records (2-space indent)
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_records()).unwrap_or_else(|_| "[]".into())
    }

    /// Plain-text table: header, rule, first ten rows, overflow note
    pub fn to_table(&self) -> String {
        let names = self.column_names();

        let mut output = format!("Found {} rows:\n\n", self.rows.len());
        output.push_str(&names.join(" | "));
        output.push('\n');
        output.push_str(&"-".repeat(names.len() * RULE_WIDTH_PER_COLUMN));
        output.push('\n');

        for row in self.rows.iter().take(TABLE_ROW_LIMIT) {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            output.push_str(&cells.join(" | "));
            output.push('\n');
        }

        if self.rows.len() > TABLE_ROW_LIMIT {
            output.push_str(&format!(
                "\n... and {} more rows",
                self.rows.len() - TABLE_ROW_LIMIT
            ));
        }

        output
    }

    pub fn render(&self, format: ResultFormat) -> String {
        match format {
            ResultFormat::Json => self.to_json_string(),
            ResultFormat::Table => self.to_table(),
        }
    }
}

fn render_cell(cell: &Value) -> String {
    match cell {
        Value::Null => "NULL".into(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// How query results are rendered for the model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Json,
    Table,
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Table => write!(f, "table"),
        }
    }
}

impl FromStr for ResultFormat {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            other => Err(QueryError::Config(format!(
                "unknown result format '{}' (expected json or table)",
                other
            ))),
        }
    }
}
