//! Narrative analysis built on top of an [`LlmClient`].

use logadvisor_core::serde_util::{opt_string_lenient, value_to_string};
use logadvisor_core::{AnalysisResult, LogRecord};
use logadvisor_workflow::{format_report, format_trace, ObservedTrace};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info, warn};

use crate::parse::parse_response;
use crate::prompt::{log_prompt, workflow_prompt};
use crate::{truncate_for_log, LlmClient, LlmError};

pub const NOT_CONFIGURED_SUMMARY: &str = "Error: AI service not configured.";
pub const NO_LOGS_SUMMARY: &str = "No logs available to analyze.";

const MAX_REPLY_LOG_CHARS: usize = 4_000;

/// One issue reported by the model. Severity is free text because models
/// use their own scale (`High`, `Critical`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFinding {
    #[serde(default, deserialize_with = "string_lenient")]
    pub message: String,
    #[serde(default, deserialize_with = "string_lenient")]
    pub root_cause: String,
    #[serde(default, deserialize_with = "string_lenient")]
    pub severity: String,
    #[serde(default, deserialize_with = "opt_string_lenient")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeAnalysis {
    #[serde(default)]
    pub errors: Vec<LogFinding>,
    #[serde(default, deserialize_with = "string_lenient")]
    pub summary: String,
    #[serde(default, deserialize_with = "strings_lenient")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl NarrativeAnalysis {
    /// An analysis with no findings and the given summary.
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}

fn string_lenient<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string_lenient(deserializer)?.unwrap_or_default())
}

fn strings_lenient<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => {
            items.into_iter().filter_map(value_to_string).collect()
        }
        Some(other) => value_to_string(other).into_iter().collect(),
        None => Vec::new(),
    })
}

/// Runs log and workflow narratives through a model. Never fails: every
/// problem is reported through the returned summary.
pub struct NarrativeAnalyzer<C: LlmClient> {
    client: C,
}

impl<C: LlmClient> NarrativeAnalyzer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Identifies errors, root causes and severities in `logs`.
    pub async fn analyze_logs(&self, logs: &[LogRecord]) -> NarrativeAnalysis {
        if !self.client.is_configured() {
            error!("inference service is not configured");
            return NarrativeAnalysis::with_summary(NOT_CONFIGURED_SUMMARY);
        }
        if logs.is_empty() {
            warn!("No logs provided for analysis");
            return NarrativeAnalysis::with_summary(NO_LOGS_SUMMARY);
        }

        let analysis = self.run(&log_prompt(logs)).await;
        info!(errors = analysis.errors.len(), "log analysis complete");
        analysis
    }

    /// Explains a workflow conformance result in prose, with recommendations.
    pub async fn analyze_workflow(
        &self,
        result: &AnalysisResult,
        trace: &ObservedTrace,
    ) -> NarrativeAnalysis {
        if !self.client.is_configured() {
            error!("inference service is not configured");
            return NarrativeAnalysis::with_summary(NOT_CONFIGURED_SUMMARY);
        }

        let prompt = workflow_prompt(&format_report(result), &format_trace(trace));
        let analysis = self.run(&prompt).await;
        info!(
            errors = analysis.errors.len(),
            recommendations = analysis.recommendations.len(),
            "workflow narrative complete"
        );
        analysis
    }

    async fn run(&self, prompt: &str) -> NarrativeAnalysis {
        debug!(prompt_len = prompt.len(), "requesting narrative analysis");
        match self.client.complete(prompt).await {
            Ok(reply) => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    debug!(
                        reply = %truncate_for_log(&reply, MAX_REPLY_LOG_CHARS),
                        "model reply"
                    );
                }
                parse_response(&reply).into_analysis(reply)
            }
            Err(LlmError::Status(status, _)) => {
                NarrativeAnalysis::with_summary(format!("Error from AI service: {}", status))
            }
            Err(e) => {
                error!("Error analyzing with inference service: {}", e);
                NarrativeAnalysis::with_summary(format!("Error during analysis: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockLlmClient;
    use async_trait::async_trait;
    use logadvisor_core::TaskExecution;

    struct Unconfigured;

    #[async_trait]
    impl LlmClient for Unconfigured {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::NotConfigured)
        }

        async fn health_check(&self) -> Result<String, LlmError> {
            Err(LlmError::NotConfigured)
        }

        fn is_configured(&self) -> bool {
            false
        }
    }

    struct Failing(u16);

    #[async_trait]
    impl LlmClient for Failing {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            if self.0 == 0 {
                Err(LlmError::Http("connection refused".to_string()))
            } else {
                Err(LlmError::Status(self.0, "boom".to_string()))
            }
        }

        async fn health_check(&self) -> Result<String, LlmError> {
            Err(LlmError::Http("down".to_string()))
        }
    }

    fn logs() -> Vec<LogRecord> {
        vec![LogRecord::new("t0", "ERROR", "payment declined")]
    }

    #[test]
    fn test_lenient_fields() {
        let analysis: NarrativeAnalysis = serde_json::from_value(serde_json::json!({
            "errors": [{"message": "x", "severity": 3, "timestamp": null}],
            "summary": "s",
            "recommendations": "restart the worker"
        }))
        .unwrap();
        assert_eq!(analysis.errors[0].severity, "3");
        assert_eq!(analysis.errors[0].root_cause, "");
        assert_eq!(analysis.recommendations, vec!["restart the worker"]);
    }

    #[tokio::test]
    async fn test_not_configured() {
        let analyzer = NarrativeAnalyzer::new(Unconfigured);
        let analysis = analyzer.analyze_logs(&logs()).await;
        assert_eq!(analysis.summary, NOT_CONFIGURED_SUMMARY);
        assert!(analysis.errors.is_empty());
    }

    #[tokio::test]
    async fn test_no_logs() {
        let analyzer = NarrativeAnalyzer::new(MockLlmClient::new("{}"));
        let analysis = analyzer.analyze_logs(&[]).await;
        assert_eq!(analysis.summary, NO_LOGS_SUMMARY);
    }

    #[tokio::test]
    async fn test_service_failures_fold_into_summary() {
        let analysis = NarrativeAnalyzer::new(Failing(503)).analyze_logs(&logs()).await;
        assert_eq!(analysis.summary, "Error from AI service: 503");

        let analysis = NarrativeAnalyzer::new(Failing(0)).analyze_logs(&logs()).await;
        assert_eq!(
            analysis.summary,
            "Error during analysis: http error: connection refused"
        );
    }

    #[tokio::test]
    async fn test_parses_reply_and_keeps_raw() {
        let reply = r#"Analysis: {"errors": [{"message": "payment declined", "root_cause": "card expired", "severity": "High"}], "summary": "Card problem"}"#;
        let analyzer = NarrativeAnalyzer::new(MockLlmClient::new(reply));
        let analysis = analyzer.analyze_logs(&logs()).await;

        assert_eq!(analysis.summary, "Card problem");
        assert_eq!(analysis.error_messages(), vec!["payment declined"]);
        assert_eq!(analysis.raw_response.as_deref(), Some(reply));
    }

    #[tokio::test]
    async fn test_workflow_narrative() {
        let reply = r#"{"errors": [], "summary": "Order stalled at shipping", "recommendations": ["Resubmit ShipOrder"]}"#;
        let analyzer = NarrativeAnalyzer::new(MockLlmClient::new(reply));
        let trace = ObservedTrace::from_executions(vec![TaskExecution::new("Create", "Completed")]);
        let result = AnalysisResult::error("Cannot analyze workflow without reference data");

        let analysis = analyzer.analyze_workflow(&result, &trace).await;
        assert_eq!(analysis.summary, "Order stalled at shipping");
        assert_eq!(analysis.recommendations, vec!["Resubmit ShipOrder"]);
    }
}
