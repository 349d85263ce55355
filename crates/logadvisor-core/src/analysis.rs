//! Conformance analysis output types.

use serde::{Deserialize, Serialize};

use crate::now_rfc3339;

/// Outcome of an analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// The analysis ran to completion (issues may still have been found).
    Success,
    /// The analysis could not be performed.
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Success => "success",
            AnalysisStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "success" => AnalysisStatus::Success,
            _ => AnalysisStatus::Error,
        }
    }
}

/// Severity of a reported issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail attached to a failed-task error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailureDetail {
    pub task: String,
    #[serde(default)]
    pub domain: Option<String>,
    pub actual_status: String,
    #[serde(default)]
    pub expected_status: Option<String>,
    #[serde(default)]
    pub actual_code: Option<String>,
    #[serde(default)]
    pub expected_code: Option<String>,
    pub severity: Severity,
    pub critical: bool,
    /// Upstream failure payload, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<serde_json::Value>,
}

/// Detail attached to an out-of-sequence error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceErrorDetail {
    pub task: String,
    /// Index of the task in the expected sequence.
    pub expected_position: usize,
    /// First index of the task in the observed sequence.
    pub actual_position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    TaskFailure(TaskFailureDetail),
    Sequence(SequenceErrorDetail),
}

/// A single issue found by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub severity: Severity,
    pub root_cause: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub detail: ErrorDetail,
}

impl ErrorRecord {
    pub fn is_sequence_error(&self) -> bool {
        matches!(self.detail, ErrorDetail::Sequence(_))
    }

    /// Name of the task this error refers to.
    pub fn task(&self) -> &str {
        match &self.detail {
            ErrorDetail::TaskFailure(d) => &d.task,
            ErrorDetail::Sequence(d) => &d.task,
        }
    }
}

/// Workflow-level facts gathered during analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    /// Observed executions, duplicates included.
    pub total_tasks: usize,
    /// Distinct observed task names.
    pub distinct_tasks: usize,
    /// Expected but never executed.
    pub missing_tasks: Vec<String>,
    /// Executed but not expected, in execution order.
    pub extra_tasks: Vec<String>,
    /// Tasks that failed their conformance check.
    pub failed_tasks: Vec<String>,
    pub has_sequence_errors: bool,
    pub expected_sequence: Vec<String>,
    pub actual_sequence: Vec<String>,
}

/// Structured result of a conformance analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    /// Fault description for `Error` results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub workflow_info: WorkflowInfo,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub critical_errors: Vec<ErrorRecord>,
    pub summary: String,
    pub timestamp: String,
}

impl AnalysisResult {
    /// Creates an `Error` result with no findings.
    pub fn error(description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            status: AnalysisStatus::Error,
            message: Some(description.clone()),
            workflow_info: WorkflowInfo::default(),
            errors: Vec::new(),
            critical_errors: Vec::new(),
            summary: description,
            timestamp: now_rfc3339(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AnalysisStatus::Success
    }

    /// True when the analysis ran and found nothing wrong.
    pub fn is_clean(&self) -> bool {
        self.is_success() && self.errors.is_empty() && self.workflow_info.missing_tasks.is_empty()
    }

    pub fn sequence_errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter().filter(|e| e.is_sequence_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(AnalysisStatus::Success).unwrap(), "success");
        assert_eq!(serde_json::to_value(Severity::Critical).unwrap(), "Critical");
        assert_eq!(AnalysisStatus::from_str("weird"), AnalysisStatus::Error);
    }

    #[test]
    fn test_error_result_shape() {
        let result = AnalysisResult::error("No workflow data to analyze");
        assert_eq!(result.status, AnalysisStatus::Error);
        assert_eq!(result.summary, "No workflow data to analyze");
        assert_eq!(result.message.as_deref(), Some("No workflow data to analyze"));
        assert!(result.errors.is_empty());
        assert!(!result.timestamp.is_empty());
    }

    #[test]
    fn test_detail_round_trips_through_untagged_enum() {
        let record = ErrorRecord {
            message: "Task 'A' executed out of sequence".into(),
            severity: Severity::Medium,
            root_cause: "Tasks executed in incorrect order".into(),
            timestamp: None,
            detail: ErrorDetail::Sequence(SequenceErrorDetail {
                task: "A".into(),
                expected_position: 0,
                actual_position: 1,
            }),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ErrorRecord = serde_json::from_str(&json).unwrap();
        assert!(back.is_sequence_error());
        assert_eq!(back.task(), "A");
    }
}
