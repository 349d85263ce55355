//! Conformance analysis of an observed trace against reference data.

use std::collections::HashSet;

use logadvisor_core::{
    now_rfc3339, AnalysisResult, AnalysisStatus, ErrorDetail, ErrorRecord, SequenceErrorDetail,
    Severity, SuccessPattern, SuccessSample, TaskExecution, TaskFailureDetail, WorkflowInfo,
    COMPLETED_STATUS,
};
use tracing::{debug, error, info, warn};

use crate::error::AnalysisError;
use crate::reference::ExpectedSequence;
use crate::trace::ObservedTrace;

pub const NO_WORKFLOW_DATA: &str = "No workflow data to analyze";
pub const NO_REFERENCE_DATA: &str = "Cannot analyze workflow without reference data";
pub const WORKFLOW_OK: &str = "Workflow executed successfully and matches expected pattern.";
pub const TASK_FAILURE_ROOT_CAUSE: &str = "Task execution failed or returned unexpected status/code";
pub const SEQUENCE_ROOT_CAUSE: &str = "Tasks executed in incorrect order";

/// Compares an observed trace against the success pattern and/or success
/// samples.
///
/// Always returns a result: empty input, missing reference data and
/// malformed reference data all produce a `status: "error"` result with no
/// findings.
pub fn analyze(
    trace: &ObservedTrace,
    pattern: Option<&SuccessPattern>,
    samples: &[SuccessSample],
) -> AnalysisResult {
    match run(trace, pattern, samples) {
        Ok(result) => result,
        Err(AnalysisError::NoInput) => {
            warn!("Workflow analysis skipped: empty trace");
            AnalysisResult::error(NO_WORKFLOW_DATA)
        }
        Err(AnalysisError::NoReference) => {
            warn!(tasks = trace.len(), "Workflow analysis skipped: no reference data");
            AnalysisResult::error(NO_REFERENCE_DATA)
        }
        Err(e) => {
            error!(error = %e, "Workflow analysis failed");
            AnalysisResult::error(format!("Error analyzing workflow: {}", e))
        }
    }
}

fn run(
    trace: &ObservedTrace,
    pattern: Option<&SuccessPattern>,
    samples: &[SuccessSample],
) -> Result<AnalysisResult, AnalysisError> {
    if trace.is_empty() {
        return Err(AnalysisError::NoInput);
    }
    let expected = ExpectedSequence::build(pattern, samples)?.ok_or(AnalysisError::NoReference)?;

    let observed: HashSet<&str> = trace.task_names().collect();
    let mut missing_tasks: Vec<String> = Vec::new();
    for name in expected.tasks() {
        if !observed.contains(name.as_str()) && !missing_tasks.contains(name) {
            missing_tasks.push(name.clone());
        }
    }
    let extra_tasks: Vec<String> = trace
        .task_names()
        .filter(|name| !expected.contains(name))
        .map(String::from)
        .collect();

    let failures = check_tasks(trace, &expected, samples);
    let sequence_errors = check_order(trace, &expected);

    let failed_tasks: Vec<String> = failures.iter().map(|e| e.task().to_string()).collect();
    let critical_errors: Vec<ErrorRecord> = failures
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .cloned()
        .collect();

    let summary = summarize(
        &failures,
        critical_errors.len(),
        &missing_tasks,
        &expected,
        !sequence_errors.is_empty(),
    );

    info!(
        tasks = trace.len(),
        failed = failures.len(),
        critical = critical_errors.len(),
        missing = missing_tasks.len(),
        extra = extra_tasks.len(),
        sequence_errors = sequence_errors.len(),
        "Workflow analysis complete"
    );

    let workflow_info = WorkflowInfo {
        total_tasks: trace.len(),
        distinct_tasks: trace.distinct_names().len(),
        missing_tasks,
        extra_tasks,
        failed_tasks,
        has_sequence_errors: !sequence_errors.is_empty(),
        expected_sequence: expected.tasks().to_vec(),
        actual_sequence: trace.task_names().map(String::from).collect(),
    };

    let mut errors = failures;
    errors.extend(sequence_errors);

    Ok(AnalysisResult {
        status: AnalysisStatus::Success,
        message: None,
        workflow_info,
        errors,
        critical_errors,
        summary,
        timestamp: now_rfc3339(),
    })
}

/// Checks each distinct observed task (latest occurrence) against its
/// success sample, in first-seen order.
fn check_tasks(
    trace: &ObservedTrace,
    expected: &ExpectedSequence,
    samples: &[SuccessSample],
) -> Vec<ErrorRecord> {
    trace
        .distinct_names()
        .into_iter()
        .filter_map(|name| trace.latest(name))
        .filter_map(|task| {
            let sample = samples.iter().find(|s| s.task_name == task.task_name);
            check_task(task, sample, expected)
        })
        .collect()
}

fn check_task(
    task: &TaskExecution,
    sample: Option<&SuccessSample>,
    expected: &ExpectedSequence,
) -> Option<ErrorRecord> {
    let (expected_status, expected_code, critical) = match sample {
        Some(s) => (
            s.expected_status.as_deref(),
            s.expected_response_code.as_deref(),
            s.is_critical,
        ),
        None => (None, None, expected.is_critical(&task.task_name)),
    };

    let status_mismatch = expected_status.filter(|want| *want != task.status);
    let code_mismatch = expected_code.filter(|want| task.response_code.as_deref() != Some(*want));

    if status_mismatch.is_none() && code_mismatch.is_none() && task.is_completed() {
        debug!(task = %task.task_name, "Task conforms");
        return None;
    }

    let mut clauses = Vec::new();
    if let Some(want) = status_mismatch {
        clauses.push(format!("status '{}' (expected '{}')", task.status, want));
    }
    if let Some(want) = code_mismatch {
        clauses.push(format!(
            "response code '{}' (expected '{}')",
            task.response_code.as_deref().unwrap_or(""),
            want
        ));
    }
    if clauses.is_empty() {
        clauses.push(format!(
            "status '{}' is not '{}'",
            task.status, COMPLETED_STATUS
        ));
    }

    let severity = if critical {
        Severity::Critical
    } else {
        Severity::Medium
    };
    debug!(task = %task.task_name, %severity, "Task failed conformance check");

    Some(ErrorRecord {
        message: format!("Task '{}' failed: {}", task.task_name, clauses.join("; ")),
        severity,
        root_cause: TASK_FAILURE_ROOT_CAUSE.to_string(),
        timestamp: task.end_time.clone().or_else(|| task.start_time.clone()),
        detail: ErrorDetail::TaskFailure(TaskFailureDetail {
            task: task.task_name.clone(),
            domain: task.domain.clone(),
            actual_status: task.status.clone(),
            expected_status: expected_status.map(String::from),
            actual_code: task.response_code.clone(),
            expected_code: expected_code.map(String::from),
            severity,
            critical,
            failure_details: task.failure_detail.clone(),
        }),
    })
}

/// Walks the raw observed sequence and flags any expected task whose
/// expected index falls below the highest index seen so far.
fn check_order(trace: &ObservedTrace, expected: &ExpectedSequence) -> Vec<ErrorRecord> {
    let mut errors = Vec::new();
    let mut prev_idx: Option<usize> = None;

    for task in trace.sequence() {
        let Some(idx) = expected.position(&task.task_name) else {
            continue;
        };
        match prev_idx {
            Some(prev) if idx < prev => {
                let actual_position = trace.first_position(&task.task_name).unwrap_or_default();
                debug!(
                    task = %task.task_name,
                    expected_position = idx,
                    actual_position,
                    "Task executed out of sequence"
                );
                errors.push(ErrorRecord {
                    message: format!("Task '{}' executed out of sequence", task.task_name),
                    severity: Severity::Medium,
                    root_cause: SEQUENCE_ROOT_CAUSE.to_string(),
                    timestamp: task.start_time.clone(),
                    detail: ErrorDetail::Sequence(SequenceErrorDetail {
                        task: task.task_name.clone(),
                        expected_position: idx,
                        actual_position,
                    }),
                });
            }
            _ => prev_idx = Some(idx),
        }
    }

    errors
}

fn summarize(
    failures: &[ErrorRecord],
    critical_failures: usize,
    missing_tasks: &[String],
    expected: &ExpectedSequence,
    has_sequence_errors: bool,
) -> String {
    if failures.is_empty() && missing_tasks.is_empty() && !has_sequence_errors {
        return WORKFLOW_OK.to_string();
    }

    let mut clauses = Vec::new();
    if critical_failures > 0 {
        clauses.push(format!("{} critical task(s) failed", critical_failures));
    } else if !failures.is_empty() {
        clauses.push(format!("{} task(s) failed", failures.len()));
    }

    let critical_missing = missing_tasks
        .iter()
        .filter(|name| expected.is_critical(name))
        .count();
    if critical_missing > 0 {
        clauses.push(format!("{} critical task(s) missing", critical_missing));
    } else if !missing_tasks.is_empty() {
        clauses.push(format!("{} task(s) missing", missing_tasks.len()));
    }

    if has_sequence_errors {
        clauses.push("tasks executed out of sequence".to_string());
    }

    format!("Workflow issues detected: {}", clauses.join(", "))
}
