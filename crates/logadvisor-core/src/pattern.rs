//! Reference data: success patterns and success samples.

use serde::{Deserialize, Serialize};

use crate::serde_util::{bool_lenient, opt_string_lenient};
use crate::CoreError;

/// One step of an expected task sequence. The step's index in its sequence
/// is its expected execution position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedPatternStep {
    #[serde(rename = "task", alias = "task_name")]
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "bool_lenient")]
    pub critical: bool,
}

impl ExpectedPatternStep {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            domain: None,
            critical: false,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Marks the step as critical.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// A pattern's ordered step list, either already decoded or still
/// JSON-encoded as text (as stored by some upstream databases).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowSequence {
    Steps(Vec<ExpectedPatternStep>),
    Encoded(String),
}

impl Default for WorkflowSequence {
    fn default() -> Self {
        WorkflowSequence::Steps(Vec::new())
    }
}

impl WorkflowSequence {
    /// Decodes the sequence into steps.
    pub fn decode(&self) -> Result<Vec<ExpectedPatternStep>, CoreError> {
        match self {
            WorkflowSequence::Steps(steps) => Ok(steps.clone()),
            WorkflowSequence::Encoded(text) => serde_json::from_str(text)
                .map_err(|e| CoreError::SequenceDecode(e.to_string())),
        }
    }
}

/// The canonical expected task sequence for an application/order-type pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuccessPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(default)]
    pub workflow_sequence: WorkflowSequence,
}

impl SuccessPattern {
    pub fn new(steps: Vec<ExpectedPatternStep>) -> Self {
        Self {
            workflow_sequence: WorkflowSequence::Steps(steps),
            ..Default::default()
        }
    }

    /// Creates a pattern whose sequence is still JSON text.
    pub fn encoded(text: impl Into<String>) -> Self {
        Self {
            workflow_sequence: WorkflowSequence::Encoded(text.into()),
            ..Default::default()
        }
    }

    pub fn for_order(mut self, app_id: i64, order_type: impl Into<String>) -> Self {
        self.app_id = Some(app_id);
        self.order_type = Some(order_type.into());
        self
    }

    pub fn steps(&self) -> Result<Vec<ExpectedPatternStep>, CoreError> {
        self.workflow_sequence.decode()
    }
}

/// Per-task expected outcome used as a comparison baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuccessSample {
    #[serde(rename = "wf_task_name")]
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub expected_status: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub expected_response_code: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub expected_response_desc: Option<String>,
    #[serde(default)]
    pub task_sequence: i64,
    #[serde(default, deserialize_with = "bool_lenient")]
    pub is_critical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SuccessSample {
    pub fn new(task_name: impl Into<String>, task_sequence: i64) -> Self {
        Self {
            task_name: task_name.into(),
            task_sequence,
            ..Default::default()
        }
    }

    pub fn expect_status(mut self, status: impl Into<String>) -> Self {
        self.expected_status = Some(status.into());
        self
    }

    pub fn expect_code(mut self, code: impl Into<String>) -> Self {
        self.expected_response_code = Some(code.into());
        self
    }

    pub fn critical(mut self) -> Self {
        self.is_critical = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_decodes_from_array_or_text() {
        let json = r#"{"workflow_sequence": [{"task": "A", "critical": true}, {"task": "B"}]}"#;
        let pattern: SuccessPattern = serde_json::from_str(json).unwrap();
        let steps = pattern.steps().unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].critical);
        assert!(!steps[1].critical);

        let json = r#"{"workflow_sequence": "[{\"task\": \"A\", \"domain\": \"OMS\"}]"}"#;
        let pattern: SuccessPattern = serde_json::from_str(json).unwrap();
        assert!(matches!(pattern.workflow_sequence, WorkflowSequence::Encoded(_)));
        let steps = pattern.steps().unwrap();
        assert_eq!(steps[0].task_name, "A");
        assert_eq!(steps[0].domain.as_deref(), Some("OMS"));
    }

    #[test]
    fn test_malformed_encoded_sequence() {
        let pattern = SuccessPattern::encoded("[{not json");
        assert!(matches!(pattern.steps(), Err(CoreError::SequenceDecode(_))));
    }

    #[test]
    fn test_sample_upstream_field_names() {
        let json = r#"{
            "wf_task_name": "ReserveInventory",
            "domain": "INV",
            "expected_status": "Completed",
            "expected_response_code": 200,
            "task_sequence": 3,
            "is_critical": 1
        }"#;
        let sample: SuccessSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.task_name, "ReserveInventory");
        assert_eq!(sample.expected_response_code.as_deref(), Some("200"));
        assert_eq!(sample.task_sequence, 3);
        assert!(sample.is_critical);
        assert_eq!(sample.notes, None);
    }
}
