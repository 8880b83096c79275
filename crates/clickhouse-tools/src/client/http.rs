//! HTTP Interface Client
//!
//! Talks to ClickHouse over its HTTP interface (port 8123 by default),
//! requesting results in the `JSON` output format.

use std::time::Duration;

use async_trait::async_trait;

use super::QueryClient;
use crate::error::{QueryError, Result};
use crate::model::QueryOutput;

/// ClickHouse connection settings
#[derive(Clone, Debug)]
pub struct ClickHouseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Default database for unqualified table names
    pub database: Option<String>,

    /// Use https instead of http
    pub secure: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8123,
            user: "default".into(),
            password: String::new(),
            database: None,
            secure: false,
            timeout_secs: 30,
        }
    }
}

impl ClickHouseConfig {
    /// Read `CLICKHOUSE_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("CLICKHOUSE_PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| QueryError::Config(format!("invalid CLICKHOUSE_PORT '{}'", raw)))?,
            Err(_) => defaults.port,
        };

        let secure = std::env::var("CLICKHOUSE_SECURE")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.secure);

        Ok(Self {
            host: std::env::var("CLICKHOUSE_HOST").unwrap_or(defaults.host),
            port,
            user: std::env::var("CLICKHOUSE_USER").unwrap_or(defaults.user),
            password: std::env::var("CLICKHOUSE_PASSWORD").unwrap_or(defaults.password),
            database: std::env::var("CLICKHOUSE_DATABASE")
                .ok()
                .filter(|db| !db.trim().is_empty()),
            secure,
            timeout_secs: defaults.timeout_secs,
        })
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// ClickHouse HTTP interface client
pub struct HttpQueryClient {
    client: reqwest::Client,
    config: ClickHouseConfig,
}

impl HttpQueryClient {
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClickHouseConfig::from_env()?)
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    fn query_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("default_format", "JSON")];
        if let Some(db) = &self.config.database {
            params.push(("database", db.as_str()));
        }
        params
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn query(&self, sql: &str) -> Result<QueryOutput> {
        tracing::debug!(endpoint = %self.config.base_url(), "Sending query");

        let response = self
            .client
            .post(self.config.base_url())
            .query(&self.query_params())
            .header("X-ClickHouse-User", &self.config.user)
            .header("X-ClickHouse-Key", &self.config.password)
            .body(sql.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(QueryError::Server {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        QueryOutput::from_json_body(&body)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/ping", self.config.base_url());
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("ClickHouse health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ClickHouse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClickHouseConfig::default();
        assert_eq!(config.base_url(), "http://localhost:8123");
        assert_eq!(config.user, "default");
        assert!(config.password.is_empty());
        assert!(config.database.is_none());
    }

    #[test]
    fn test_secure_base_url() {
        let config = ClickHouseConfig {
            host: "abc.clickhouse.cloud".into(),
            port: 8443,
            secure: true,
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://abc.clickhouse.cloud:8443");
    }

    #[test]
    fn test_query_params_include_database() {
        let client = HttpQueryClient::new(ClickHouseConfig::default()).unwrap();
        assert_eq!(client.query_params(), vec![("default_format", "JSON")]);

        let client = HttpQueryClient::new(ClickHouseConfig {
            database: Some("analytics".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.query_params(),
            vec![("default_format", "JSON"), ("database", "analytics")]
        );
        assert_eq!(client.name(), "ClickHouse");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = HttpQueryClient::new(ClickHouseConfig {
            port: 1,
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(client.query("SELECT 1").await, Err(QueryError::Network(_))));
        assert!(!client.health_check().await);
    }
}
