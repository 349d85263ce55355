//! Prompt builders.

use logadvisor_core::LogRecord;

const RESPONSE_SHAPE: &str = r#"{
    "errors": [
        {
            "message": "Error message text",
            "root_cause": "Likely cause of the error",
            "severity": "Severity level",
            "timestamp": "When the error occurred"
        }
    ],
    "summary": "Brief summary of the issues found""#;

/// Prompt asking for errors, root causes and severities in a set of logs.
pub fn log_prompt(logs: &[LogRecord]) -> String {
    let mut log_text = String::new();
    for log in logs {
        log_text.push_str(&log.render_line());
        log_text.push('\n');
    }

    let mut prompt = String::from(
        "Analyze the following system logs and identify any errors or issues:\n\n",
    );
    prompt.push_str(&log_text);
    prompt.push_str("\nPlease provide:\n");
    prompt.push_str("1. A list of all error messages found\n");
    prompt.push_str("2. The likely root cause of each error\n");
    prompt.push_str("3. The severity level (Critical, High, Medium, Low)\n\n");
    prompt.push_str("Format your response as JSON with the structure:\n");
    prompt.push_str(RESPONSE_SHAPE);
    prompt.push_str("\n}\n");
    prompt
}

/// Prompt asking for an explanation of a workflow conformance report.
/// `report` and `trace` are the plain-text renderings of the analysis
/// result and the observed trace.
pub fn workflow_prompt(report: &str, trace: &str) -> String {
    let mut prompt = String::from(
        "Review the following order workflow analysis. The workflow was compared \
         against its expected success pattern.\n\n",
    );
    prompt.push_str(report.trim_end());
    prompt.push_str("\n\n");
    prompt.push_str(trace.trim_end());
    prompt.push_str("\n\nPlease provide:\n");
    prompt.push_str("1. Each problem that affected this order\n");
    prompt.push_str("2. The likely root cause of each problem\n");
    prompt.push_str("3. The severity level (Critical, High, Medium, Low)\n");
    prompt.push_str("4. Concrete steps to resolve the order\n\n");
    prompt.push_str("Format your response as JSON with the structure:\n");
    prompt.push_str(RESPONSE_SHAPE);
    prompt.push_str(",\n    \"recommendations\": [\"Step to resolve the issue\"]\n}\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_prompt_renders_lines() {
        let logs = vec![
            LogRecord::new("2024-05-01T10:00:00Z", "ERROR", "payment declined"),
            LogRecord::new("2024-05-01T10:00:01Z", "INFO", "retrying"),
        ];
        let prompt = log_prompt(&logs);
        assert!(prompt.contains("[2024-05-01T10:00:00Z] [ERROR] payment declined\n"));
        assert!(prompt.contains("[2024-05-01T10:00:01Z] [INFO] retrying\n"));
        assert!(prompt.contains("\"root_cause\""));
        assert!(prompt.trim_end().ends_with('}'));
    }

    #[test]
    fn test_workflow_prompt_embeds_report() {
        let prompt = workflow_prompt("WORKFLOW ANALYSIS\nStatus: success\n", "WORKFLOW TRACE (0 executions)\n");
        assert!(prompt.contains("WORKFLOW ANALYSIS\nStatus: success\n\nWORKFLOW TRACE"));
        assert!(prompt.contains("\"recommendations\""));
        assert!(prompt.trim_end().ends_with('}'));
    }
}
