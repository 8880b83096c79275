//! Service Kit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the database assistant.

mod query;

pub use query::QueryClickHouseTool;
