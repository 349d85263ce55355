//! Log retrieval for a work order and task within a time window.

mod elk;
mod query;

pub use elk::{normalize_hit, ElkLogSource, ElkLogSourceConfig};
pub use query::{LogQuery, LogScope, DEFAULT_MAX_LOGS};

use async_trait::async_trait;
use logadvisor_core::LogRecord;
use thiserror::Error;

/// Errors from log retrieval.
#[derive(Debug, Error)]
pub enum LogSourceError {
    #[error("log service is not configured")]
    NotConfigured,
    #[error("{0}")]
    InvalidQuery(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("HTTP {0}: {1}")]
    Status(u16, String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A backend that can be searched for log records.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Logs matching `query`, oldest first. An empty result is not an error.
    async fn retrieve(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LogSourceError>;

    /// Checks connectivity and describes the backend.
    async fn test_connection(&self) -> Result<String, LogSourceError>;

    fn is_configured(&self) -> bool {
        true
    }
}

/// Log source serving a fixed set of records (for tests).
#[derive(Debug, Clone, Default)]
pub struct StaticLogSource {
    pub logs: Vec<LogRecord>,
}

impl StaticLogSource {
    pub fn new(logs: Vec<LogRecord>) -> Self {
        Self { logs }
    }
}

#[async_trait]
impl LogSource for StaticLogSource {
    async fn retrieve(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LogSourceError> {
        Ok(self.logs.iter().take(query.max_logs).cloned().collect())
    }

    async fn test_connection(&self) -> Result<String, LogSourceError> {
        Ok(format!("Static source with {} logs", self.logs.len()))
    }
}
