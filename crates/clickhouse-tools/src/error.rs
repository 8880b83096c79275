//! Error Types for ClickHouse Tools

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("ClickHouse returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("No canned result for query: {0}")]
    UnknownQuery(String),

    #[error("Malformed result: {0}")]
    MalformedResult(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = QueryError::Server {
            status: 404,
            message: "Code: 60. DB::Exception: Table default.nope does not exist.".into(),
        };
        assert_eq!(
            err.to_string(),
            "ClickHouse returned 404: Code: 60. DB::Exception: Table default.nope does not exist."
        );
        assert_eq!(
            QueryError::UnknownQuery("SELECT 2".into()).to_string(),
            "No canned result for query: SELECT 2"
        );
    }
}
