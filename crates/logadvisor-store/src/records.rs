use serde::{Deserialize, Serialize};

/// An application whose transactions can be investigated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub app_id: i64,
    pub app_name: String,
    /// Log index or source name in the log backend.
    pub log_source: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// How an application's logs are searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    pub app_id: i64,
    pub index_pattern: String,
    /// Field holding the transaction/work-order identifier.
    pub transaction_field: String,
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
}

fn default_timestamp_field() -> String {
    "timestamp".to_string()
}
