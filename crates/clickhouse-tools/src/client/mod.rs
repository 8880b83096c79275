//! Query Clients
//!
//! Abstractions and implementations for executing SQL against ClickHouse.

mod http;
mod mock;

pub use http::{ClickHouseConfig, HttpQueryClient};
pub use mock::MockQueryClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::QueryOutput;

/// Query client trait (Strategy pattern)
///
/// Implemented by the HTTP interface client and by the in-memory mock.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Execute a SQL statement and collect its rows
    async fn query(&self, sql: &str) -> Result<QueryOutput>;

    /// Check if the server is reachable
    async fn health_check(&self) -> bool;

    /// Client name
    fn name(&self) -> &str;
}
