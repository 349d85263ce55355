//! Observed trace normalization.

use std::collections::{HashMap, HashSet};

use logadvisor_core::serde_util::opt_string_lenient;
use logadvisor_core::{CoreError, TaskExecution};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Keys under which a workflow-detail object may hold its task list.
const TASK_LIST_KEYS: [&str; 2] = ["tasks", "workflow_details"];

/// A task execution as reported by the upstream workflow system.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTaskExecution {
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub wf_task_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub resp_status_code: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub resp_status_desc: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub transaction_start_time: Option<String>,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub transaction_end_time: Option<String>,
    #[serde(default)]
    pub failure_details: Option<Value>,
}

impl RawTaskExecution {
    fn into_execution(self) -> Option<TaskExecution> {
        let task_name = self.wf_task_name?.trim().to_string();
        if task_name.is_empty() {
            return None;
        }
        Some(TaskExecution {
            task_name,
            status: self.status.unwrap_or_default(),
            response_code: self.resp_status_code,
            response_desc: self.resp_status_desc,
            domain: self.domain,
            start_time: self.transaction_start_time,
            end_time: self.transaction_end_time,
            failure_detail: self.failure_details,
        })
    }
}

/// Ordered task executions plus a by-name index of the latest occurrence.
#[derive(Debug, Clone, Default)]
pub struct ObservedTrace {
    sequence: Vec<TaskExecution>,
    latest: HashMap<String, usize>,
}

/// Normalizes raw upstream records into an [`ObservedTrace`]. Records
/// without a task name are dropped.
pub fn normalize(records: impl IntoIterator<Item = RawTaskExecution>) -> ObservedTrace {
    let mut dropped = 0usize;
    let executions: Vec<TaskExecution> = records
        .into_iter()
        .filter_map(|raw| {
            let execution = raw.into_execution();
            if execution.is_none() {
                dropped += 1;
            }
            execution
        })
        .collect();

    if dropped > 0 {
        debug!(dropped, "Dropped task records without a task name");
    }
    ObservedTrace::from_executions(executions)
}

impl ObservedTrace {
    /// Builds a trace from already-typed executions.
    pub fn from_executions(executions: Vec<TaskExecution>) -> Self {
        let sequence: Vec<TaskExecution> = executions
            .into_iter()
            .filter(|t| !t.task_name.trim().is_empty())
            .collect();

        let latest = sequence
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.task_name.clone(), idx))
            .collect();

        Self { sequence, latest }
    }

    /// Decodes a workflow-detail payload: either an array of task records or
    /// an object holding one under `tasks` or `workflow_details`.
    pub fn from_payload(payload: &Value) -> Result<Self, CoreError> {
        let entries = match payload {
            Value::Array(items) => items,
            Value::Object(map) => TASK_LIST_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .ok_or_else(|| {
                    CoreError::ParseError("workflow payload has no task list".to_string())
                })?,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(CoreError::ParseError(
                    "workflow payload must be an array or object".to_string(),
                ))
            }
        };

        let records = entries.iter().filter_map(|entry| {
            if !entry.is_object() {
                debug!("Skipping non-object task record");
                return None;
            }
            match RawTaskExecution::deserialize(entry) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable task record");
                    None
                }
            }
        });

        Ok(normalize(records))
    }

    /// Every execution in reported order, duplicates included.
    pub fn sequence(&self) -> &[TaskExecution] {
        &self.sequence
    }

    /// The most recent execution of the named task.
    pub fn latest(&self, task_name: &str) -> Option<&TaskExecution> {
        self.latest.get(task_name).map(|&idx| &self.sequence[idx])
    }

    /// Task names in execution order, duplicates included.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.sequence.iter().map(|t| t.task_name.as_str())
    }

    /// Distinct task names in first-seen order.
    pub fn distinct_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.task_names().filter(|name| seen.insert(*name)).collect()
    }

    /// Index of the first execution of the named task.
    pub fn first_position(&self, task_name: &str) -> Option<usize> {
        self.task_names().position(|name| name == task_name)
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.latest.contains_key(task_name)
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_array_maps_upstream_fields() {
        let payload = json!([
            {
                "wf_task_name": "CreateOrder",
                "status": "Completed",
                "resp_status_code": 200,
                "resp_status_desc": "OK",
                "domain": "OMS",
                "transaction_start_time": "2024-05-01T10:00:00",
                "transaction_end_time": "2024-05-01T10:00:02"
            }
        ]);
        let trace = ObservedTrace::from_payload(&payload).unwrap();
        assert_eq!(trace.len(), 1);

        let task = trace.latest("CreateOrder").unwrap();
        assert_eq!(task.response_code.as_deref(), Some("200"));
        assert_eq!(task.domain.as_deref(), Some("OMS"));
        assert_eq!(task.end_time.as_deref(), Some("2024-05-01T10:00:02"));
        assert!(task.failure_detail.is_none());
    }

    #[test]
    fn test_nameless_records_are_dropped() {
        let payload = json!({
            "tasks": [
                {"status": "Completed"},
                {"wf_task_name": "", "status": "Completed"},
                {"wf_task_name": null},
                "garbage",
                {"wf_task_name": "A", "status": "Completed"}
            ]
        });
        let trace = ObservedTrace::from_payload(&payload).unwrap();
        assert_eq!(trace.task_names().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_duplicates_keep_order_and_index_latest() {
        let trace = normalize(vec![
            RawTaskExecution {
                wf_task_name: Some("A".into()),
                status: Some("Failed".into()),
                ..Default::default()
            },
            RawTaskExecution {
                wf_task_name: Some("B".into()),
                status: Some("Completed".into()),
                ..Default::default()
            },
            RawTaskExecution {
                wf_task_name: Some("A".into()),
                status: Some("Completed".into()),
                ..Default::default()
            },
        ]);

        assert_eq!(trace.task_names().collect::<Vec<_>>(), vec!["A", "B", "A"]);
        assert_eq!(trace.distinct_names(), vec!["A", "B"]);
        assert_eq!(trace.latest("A").unwrap().status, "Completed");
        assert_eq!(trace.first_position("A"), Some(0));
    }

    #[test]
    fn test_missing_status_normalizes_to_empty() {
        let trace = normalize(vec![RawTaskExecution {
            wf_task_name: Some("A".into()),
            ..Default::default()
        }]);
        assert_eq!(trace.latest("A").unwrap().status, "");
    }

    #[test]
    fn test_failure_details_carried_verbatim() {
        let payload = json!({
            "workflow_details": [{
                "wf_task_name": "Charge",
                "status": "Failed",
                "failure_details": {"code": "GW_TIMEOUT", "retries": 3}
            }]
        });
        let trace = ObservedTrace::from_payload(&payload).unwrap();
        assert_eq!(
            trace.latest("Charge").unwrap().failure_detail,
            Some(json!({"code": "GW_TIMEOUT", "retries": 3}))
        );
    }

    #[test]
    fn test_rejects_scalar_payload() {
        assert!(ObservedTrace::from_payload(&json!(42)).is_err());
        assert!(ObservedTrace::from_payload(&json!({"other": []})).is_err());
        assert!(ObservedTrace::from_payload(&Value::Null).unwrap().is_empty());
    }
}
