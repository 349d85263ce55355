//! Narrative analysis of logs and workflow reports via a hosted model.
//!
//! [`InferenceClient`] talks to the inference endpoint; [`NarrativeAnalyzer`]
//! builds prompts, calls any [`LlmClient`] and turns the free-form reply into
//! a [`NarrativeAnalysis`] through an ordered chain of [`ResponseParser`]s.

mod client;
mod narrative;
mod parse;
mod prompt;

pub use client::{InferenceClient, InferenceClientConfig};
pub use narrative::{
    LogFinding, NarrativeAnalysis, NarrativeAnalyzer, NOT_CONFIGURED_SUMMARY, NO_LOGS_SUMMARY,
};
pub use parse::{
    default_parsers, parse_response, BraceSpan, FencedBlock, FieldPattern, LineScan, ParseOutcome,
    ResponseParser, StrictJson, UNPARSEABLE_SUMMARY,
};
pub use prompt::{log_prompt, workflow_prompt};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from model calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("HTTP {0}: {1}")]
    Status(u16, String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("inference service not configured")]
    NotConfigured,
}

/// A text-in, text-out model endpoint.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Sends a minimal request and describes the outcome.
    async fn health_check(&self) -> Result<String, LlmError>;

    fn is_configured(&self) -> bool {
        true
    }
}

#[async_trait]
impl LlmClient for Arc<dyn LlmClient> {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt).await
    }

    async fn health_check(&self) -> Result<String, LlmError> {
        (**self).health_check().await
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

/// Mock client returning a canned reply (for tests).
pub struct MockLlmClient {
    pub response: String,
}

impl MockLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }

    async fn health_check(&self) -> Result<String, LlmError> {
        Ok("mock client ready".to_string())
    }
}

pub(crate) fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(
            truncate_for_log("abcdef", 3),
            "abc... [truncated, total_chars=6]"
        );
    }
}
