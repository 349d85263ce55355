//! Observed task execution records.

use serde::{Deserialize, Serialize};

use crate::COMPLETED_STATUS;

/// A single task execution from a workflow trace.
///
/// Identity is `task_name` within one trace. Records are created by the
/// trace normalizer and are not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecution {
    /// Workflow task name.
    pub task_name: String,
    /// Status reported by the upstream system (empty if absent).
    pub status: String,
    /// Response status code, stringified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    /// Response status description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_desc: Option<String>,
    /// Owning domain/system of the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Transaction start time as reported upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Transaction end time as reported upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Opaque failure payload, carried through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<serde_json::Value>,
}

impl TaskExecution {
    pub fn new(task_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            status: status.into(),
            response_code: None,
            response_desc: None,
            domain: None,
            start_time: None,
            end_time: None,
            failure_detail: None,
        }
    }

    pub fn with_response_code(mut self, code: impl Into<String>) -> Self {
        self.response_code = Some(code.into());
        self
    }

    pub fn with_response_desc(mut self, desc: impl Into<String>) -> Self {
        self.response_desc = Some(desc.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_times(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = Some(start.into());
        self.end_time = Some(end.into());
        self
    }

    pub fn with_failure_detail(mut self, detail: serde_json::Value) -> Self {
        self.failure_detail = Some(detail);
        self
    }

    /// Returns true if the reported status is exactly `"Completed"`.
    pub fn is_completed(&self) -> bool {
        self.status == COMPLETED_STATUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_is_case_sensitive() {
        assert!(TaskExecution::new("A", "Completed").is_completed());
        assert!(!TaskExecution::new("A", "completed").is_completed());
        assert!(!TaskExecution::new("A", "").is_completed());
    }

    #[test]
    fn test_optional_fields_skipped_when_absent() {
        let json = serde_json::to_value(TaskExecution::new("A", "Completed")).unwrap();
        assert_eq!(json, serde_json::json!({"task_name": "A", "status": "Completed"}));
    }
}
