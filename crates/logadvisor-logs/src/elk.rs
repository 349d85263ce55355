//! Elasticsearch/ELK log source.

use std::time::Duration;

use async_trait::async_trait;
use logadvisor_core::serde_util::value_to_string;
use logadvisor_core::LogRecord;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::query::LogQuery;
use crate::{LogSource, LogSourceError};

const CONNECTION_TIMEOUT_SECS: u64 = 10;

const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "@timestamp", "time"];
const LEVEL_FIELDS: &[&str] = &["level", "log_level", "severity"];
const MESSAGE_FIELDS: &[&str] = &["message", "msg", "log_message"];
const SERVICE_FIELDS: &[&str] = &["service", "service_name", "application"];
const TRANSACTION_FIELDS: &[&str] = &["transaction_id", "txid", "request_id"];

#[derive(Debug, Clone)]
pub struct ElkLogSourceConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for ElkLogSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Searches an ELK cluster over its REST API with basic auth.
pub struct ElkLogSource {
    client: Client,
    config: ElkLogSourceConfig,
}

impl ElkLogSource {
    pub fn new(config: ElkLogSourceConfig) -> Result<Self, LogSourceError> {
        if config.endpoint.is_empty() {
            warn!("ELK endpoint is not set");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LogSourceError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Content-Type", "application/json")
    }

    async fn get_json(&self, path: &str) -> Result<Value, LogSourceError> {
        let response = self
            .authed(self.client.get(self.url(path)))
            .timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| LogSourceError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LogSourceError::Status(status, text));
        }

        response
            .json()
            .await
            .map_err(|e| LogSourceError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl LogSource for ElkLogSource {
    async fn retrieve(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LogSourceError> {
        if !self.is_configured() {
            error!("ELK service is not configured");
            return Err(LogSourceError::NotConfigured);
        }

        let path = query.search_path();
        info!(
            work_order = %query.work_order,
            task = %query.task_name,
            path = %path,
            "Retrieving logs"
        );

        let response = self
            .authed(self.client.post(self.url(&path)))
            .json(&query.search_body())
            .send()
            .await
            .map_err(|e| LogSourceError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            error!(status, "ELK API error: {}", text);
            return Err(LogSourceError::Status(status, text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LogSourceError::Serialization(e.to_string()))?;

        let logs: Vec<LogRecord> = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| hits.iter().map(normalize_hit).collect())
            .unwrap_or_default();

        if logs.is_empty() {
            info!(work_order = %query.work_order, task = %query.task_name, "No logs found");
        } else {
            debug!(count = logs.len(), "Retrieved logs from ELK");
        }
        Ok(logs)
    }

    async fn test_connection(&self) -> Result<String, LogSourceError> {
        if !self.is_configured() {
            return Err(LogSourceError::NotConfigured);
        }

        match self.get_json("/_cluster/health").await {
            Ok(health) => {
                let name = health
                    .get("cluster_name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                let status = health.get("status").and_then(Value::as_str).unwrap_or("unknown");
                Ok(format!(
                    "Successfully connected to ELK cluster '{}' (status: {})",
                    name, status
                ))
            }
            Err(e) => {
                // Users without cluster-level access can still list indices.
                debug!("Cluster health unavailable, trying index listing: {}", e);
                let indices = self.get_json("/_cat/indices?format=json").await?;
                let count = indices.as_array().map(Vec::len).unwrap_or(0);
                Ok(format!("Successfully connected to ELK. Found {} indices.", count))
            }
        }
    }

    fn is_configured(&self) -> bool {
        !self.config.endpoint.is_empty()
            && !self.config.username.is_empty()
            && !self.config.password.is_empty()
    }
}

fn first_field(source: &Value, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| source.get(*name).filter(|v| !v.is_null()))
        .cloned()
        .and_then(value_to_string)
        .unwrap_or_default()
}

/// Maps one search hit onto a [`LogRecord`], trying each known field
/// spelling in turn.
pub fn normalize_hit(hit: &Value) -> LogRecord {
    let empty = Value::Null;
    let source = hit.get("_source").unwrap_or(&empty);

    LogRecord {
        timestamp: first_field(source, TIMESTAMP_FIELDS),
        level: first_field(source, LEVEL_FIELDS),
        message: first_field(source, MESSAGE_FIELDS),
        service: first_field(source, SERVICE_FIELDS),
        transaction_id: first_field(source, TRANSACTION_FIELDS),
        host: source.get("host").cloned(),
        error_details: source.get("error").cloned(),
    }
}
