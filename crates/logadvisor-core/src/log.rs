//! Normalized log records.

use serde::{Deserialize, Serialize};

/// A log line returned by a log backend, with backend-specific field names
/// already mapped onto a fixed shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

/// Coarse level buckets used for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevelClass {
    Error,
    Warning,
    Info,
}

impl LogRecord {
    pub fn new(
        timestamp: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level: level.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn level_class(&self) -> LogLevelClass {
        match self.level.to_ascii_uppercase().as_str() {
            "ERROR" | "SEVERE" | "FATAL" => LogLevelClass::Error,
            "WARN" | "WARNING" => LogLevelClass::Warning,
            _ => LogLevelClass::Info,
        }
    }

    /// Renders the record as `[timestamp] [level] message`.
    pub fn render_line(&self) -> String {
        format!("[{}] [{}] {}", self.timestamp, self.level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_class() {
        assert_eq!(LogRecord::new("t", "error", "x").level_class(), LogLevelClass::Error);
        assert_eq!(LogRecord::new("t", "SEVERE", "x").level_class(), LogLevelClass::Error);
        assert_eq!(LogRecord::new("t", "Warn", "x").level_class(), LogLevelClass::Warning);
        assert_eq!(LogRecord::new("t", "DEBUG", "x").level_class(), LogLevelClass::Info);
    }

    #[test]
    fn test_render_line() {
        let record = LogRecord::new("2024-01-01T00:00:00Z", "INFO", "started");
        assert_eq!(record.render_line(), "[2024-01-01T00:00:00Z] [INFO] started");
    }
}
