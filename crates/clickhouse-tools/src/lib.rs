//! # clickhouse-tools
//!
//! SQL tooling that lets the agent answer questions about data held in
//! ClickHouse.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  query_clickhouse   ┌──────────────────┐  POST /?default_format=JSON
//! │ Agent (LLM)  │ ──────────────────▶ │ QueryClickHouse  │ ─────────────────────────▶ ClickHouse
//! │              │ ◀────────────────── │ Tool             │ ◀───────────────────────── (HTTP :8123)
//! └──────────────┘  rows as JSON/table └──────────────────┘  {"meta": [...], "data": [...]}
//! ```
//!
//! The tool never fails across the agent boundary: query errors come back as
//! text so the model can read them and correct its SQL.

pub mod svckit;
pub mod client;
pub mod model;
pub mod error;

pub use client::{ClickHouseConfig, HttpQueryClient, MockQueryClient, QueryClient};
pub use error::{QueryError, Result};
pub use model::{Column, QueryOutput, ResultFormat};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::QueryClickHouseTool;
}

/// System prompt for the database assistant agent
pub const DATABASE_ASSISTANT_PROMPT: &str = "You are a helpful database assistant. \
When users ask questions about data, write and execute SQL queries against ClickHouse. \
Always explain your results in a clear, human-friendly way.";
