//! Plain-text rendering of analysis results and traces.
//!
//! The layout is consumed verbatim by the narrative-analysis prompt, so
//! changes here change what the model sees.

use logadvisor_core::{AnalysisResult, ErrorDetail, ErrorRecord};

use crate::trace::ObservedTrace;

/// Renders an analysis result as a text block.
pub fn format_report(result: &AnalysisResult) -> String {
    let info = &result.workflow_info;
    let mut out = String::new();

    out.push_str("WORKFLOW ANALYSIS\n");
    out.push_str(&format!("Status: {}\n", result.status.as_str()));
    out.push_str(&format!("Summary: {}\n", result.summary));
    out.push_str(&format!(
        "Total tasks: {} (distinct: {})\n",
        info.total_tasks, info.distinct_tasks
    ));
    out.push_str(&format!("Missing tasks: {}\n", list_or_none(&info.missing_tasks)));
    out.push_str(&format!("Extra tasks: {}\n", list_or_none(&info.extra_tasks)));
    out.push_str(&format!("Failed tasks: {}\n", list_or_none(&info.failed_tasks)));
    out.push_str(&format!(
        "Sequence errors: {}\n",
        if info.has_sequence_errors { "yes" } else { "no" }
    ));

    if result.errors.is_empty() {
        out.push_str("\nERRORS: none\n");
        return out;
    }

    out.push_str(&format!("\nERRORS ({})\n", result.errors.len()));
    for (i, error) in result.errors.iter().enumerate() {
        push_error(&mut out, i + 1, error);
    }
    out
}

fn push_error(out: &mut String, number: usize, error: &ErrorRecord) {
    out.push_str(&format!("{}. {}\n", number, error.message));
    out.push_str(&format!("   Severity: {}\n", error.severity));
    out.push_str(&format!("   Root cause: {}\n", error.root_cause));
    if let Some(ts) = &error.timestamp {
        out.push_str(&format!("   Timestamp: {}\n", ts));
    }

    match &error.detail {
        ErrorDetail::TaskFailure(d) => {
            out.push_str(&format!("   Task: {}\n", d.task));
            if let Some(domain) = &d.domain {
                out.push_str(&format!("   Domain: {}\n", domain));
            }
            out.push_str(&format!(
                "   Status: actual '{}', expected '{}'\n",
                d.actual_status,
                d.expected_status.as_deref().unwrap_or("unknown")
            ));
            out.push_str(&format!(
                "   Response code: actual '{}', expected '{}'\n",
                d.actual_code.as_deref().unwrap_or("none"),
                d.expected_code.as_deref().unwrap_or("unknown")
            ));
            out.push_str(&format!("   Critical: {}\n", if d.critical { "yes" } else { "no" }));
            if let Some(details) = &d.failure_details {
                out.push_str(&format!("   Failure details: {}\n", details));
            }
        }
        ErrorDetail::Sequence(d) => {
            out.push_str(&format!("   Task: {}\n", d.task));
            out.push_str(&format!("   Expected position: {}\n", d.expected_position));
            out.push_str(&format!("   Actual position: {}\n", d.actual_position));
        }
    }
}

/// Renders the raw observed trace, one execution per line.
pub fn format_trace(trace: &ObservedTrace) -> String {
    let mut out = format!("WORKFLOW TRACE ({} executions)\n", trace.len());
    for (i, task) in trace.sequence().iter().enumerate() {
        out.push_str(&format!("{}. {}", i + 1, task.task_name));
        if let Some(domain) = &task.domain {
            out.push_str(&format!(" [{}]", domain));
        }
        out.push_str(&format!(" status={}", display_or_dash(&task.status)));
        if let Some(code) = &task.response_code {
            out.push_str(&format!(" code={}", code));
        }
        if let Some(desc) = &task.response_desc {
            out.push_str(&format!(" desc=\"{}\"", desc));
        }
        if let Some(start) = &task.start_time {
            out.push_str(&format!(" start={}", start));
        }
        if let Some(end) = &task.end_time {
            out.push_str(&format!(" end={}", end));
        }
        out.push('\n');
        if let Some(detail) = &task.failure_detail {
            out.push_str(&format!("   failure: {}\n", detail));
        }
    }
    out
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;
    use logadvisor_core::{ExpectedPatternStep, SuccessPattern, TaskExecution};

    #[test]
    fn test_clean_report() {
        let trace = ObservedTrace::from_executions(vec![TaskExecution::new("A", "Completed")]);
        let pattern = SuccessPattern::new(vec![ExpectedPatternStep::new("A")]);
        let report = format_report(&analyze(&trace, Some(&pattern), &[]));

        assert!(report.starts_with("WORKFLOW ANALYSIS\nStatus: success\n"));
        assert!(report.contains("Missing tasks: none\n"));
        assert!(report.contains("Sequence errors: no\n"));
        assert!(report.ends_with("ERRORS: none\n"));
    }

    #[test]
    fn test_report_lists_errors() {
        let trace = ObservedTrace::from_executions(vec![
            TaskExecution::new("B", "Completed"),
            TaskExecution::new("A", "Failed")
                .with_domain("BILLING")
                .with_failure_detail(serde_json::json!({"reason": "timeout"})),
        ]);
        let pattern = SuccessPattern::new(vec![
            ExpectedPatternStep::new("A").critical(),
            ExpectedPatternStep::new("B"),
            ExpectedPatternStep::new("C"),
        ]);
        let report = format_report(&analyze(&trace, Some(&pattern), &[]));

        assert!(report.contains("Missing tasks: C\n"));
        assert!(report.contains("Failed tasks: A\n"));
        assert!(report.contains("Sequence errors: yes\n"));
        assert!(report.contains("ERRORS (2)\n"));
        assert!(report.contains("1. Task 'A' failed: status 'Failed' is not 'Completed'\n"));
        assert!(report.contains("   Severity: Critical\n"));
        assert!(report.contains("   Domain: BILLING\n"));
        assert!(report.contains("   Failure details: {\"reason\":\"timeout\"}\n"));
        assert!(report.contains("2. Task 'A' executed out of sequence\n"));
        assert!(report.contains("   Expected position: 0\n   Actual position: 1\n"));
    }

    #[test]
    fn test_trace_rendering() {
        let trace = ObservedTrace::from_executions(vec![
            TaskExecution::new("A", "Completed")
                .with_domain("OMS")
                .with_response_code("200")
                .with_times("t0", "t1"),
            TaskExecution::new("B", ""),
        ]);
        let text = format_trace(&trace);
        assert_eq!(
            text,
            "WORKFLOW TRACE (2 executions)\n1. A [OMS] status=Completed code=200 start=t0 end=t1\n2. B status=-\n"
        );
    }
}
