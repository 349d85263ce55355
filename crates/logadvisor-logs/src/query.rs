use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::LogSourceError;

pub const DEFAULT_MAX_LOGS: usize = 1000;

const DEFAULT_TRANSACTION_FIELD: &str = "work_order.keyword";
const DEFAULT_TIMESTAMP_FIELD: &str = "timestamp";

/// Where an application's logs live and which fields identify a
/// transaction and its time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogScope {
    /// Index name or pattern, e.g. `oms-*`.
    pub index_pattern: String,
    pub transaction_field: String,
    pub timestamp_field: String,
}

impl LogScope {
    pub fn new(index_pattern: impl Into<String>) -> Self {
        Self {
            index_pattern: index_pattern.into(),
            transaction_field: DEFAULT_TRANSACTION_FIELD.to_string(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
        }
    }

    pub fn with_transaction_field(mut self, field: impl Into<String>) -> Self {
        self.transaction_field = field.into();
        self
    }

    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }
}

/// What to search for: one task of one work order, inside a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogQuery {
    pub work_order: String,
    pub task_name: String,
    /// Window start, RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC).
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
    /// Limits the search to one application's indices. Without it every
    /// index is searched with the default field names.
    #[serde(default)]
    pub scope: Option<LogScope>,
}

fn default_max_logs() -> usize {
    DEFAULT_MAX_LOGS
}

impl LogQuery {
    pub fn new(
        work_order: impl Into<String>,
        task_name: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            work_order: work_order.into(),
            task_name: task_name.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            max_logs: DEFAULT_MAX_LOGS,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: LogScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Path of the `_search` endpoint, relative to the cluster root.
    pub fn search_path(&self) -> String {
        match &self.scope {
            Some(scope) if !scope.index_pattern.trim().is_empty() => {
                format!("/{}/_search", scope.index_pattern.trim().trim_matches('/'))
            }
            _ => "/_search".to_string(),
        }
    }

    pub fn with_max_logs(mut self, max_logs: usize) -> Self {
        self.max_logs = max_logs;
        self
    }

    /// Rejects blank identifiers and windows that do not move forward.
    pub fn validate(&self) -> Result<(), LogSourceError> {
        if self.work_order.trim().is_empty() || self.task_name.trim().is_empty() {
            return Err(LogSourceError::InvalidQuery(
                "Work Order and Task Name are required fields".to_string(),
            ));
        }

        let start = parse_time(&self.start_time)?;
        let end = parse_time(&self.end_time)?;
        if end <= start {
            return Err(LogSourceError::InvalidQuery(
                "End time must be after start time".to_string(),
            ));
        }

        Ok(())
    }

    /// Elasticsearch `_search` body for this query.
    pub fn search_body(&self) -> Value {
        let (transaction_field, timestamp_field) = match &self.scope {
            Some(scope) => (scope.transaction_field.as_str(), scope.timestamp_field.as_str()),
            None => (DEFAULT_TRANSACTION_FIELD, DEFAULT_TIMESTAMP_FIELD),
        };
        json!({
            "query": {
                "bool": {
                    "must": [
                        {"match": {transaction_field: self.work_order}},
                        {"match": {"task_name.keyword": self.task_name}},
                        {"range": {timestamp_field: {"gte": self.start_time, "lte": self.end_time}}}
                    ]
                }
            },
            "sort": [{timestamp_field: {"order": "asc"}}],
            "size": self.max_logs
        })
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, LogSourceError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(LogSourceError::InvalidQuery(format!("Invalid time: '{}'", raw)))
}
