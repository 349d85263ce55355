//! Client for the hosted inference API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{truncate_for_log, LlmClient, LlmError};

const GENERATE_PATH: &str = "/inference/generate";
const HEALTH_PROMPT: &str = "Return 'Connection successful' as a simple test.";
const HEALTH_TEMPERATURE: f32 = 0.1;
const HEALTH_MAX_TOKENS: u32 = 20;
const HEALTH_TIMEOUT_SECS: u64 = 10;
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Connection and generation settings for [`InferenceClient`].
#[derive(Debug, Clone)]
pub struct InferenceClientConfig {
    /// Base URL; requests go to `<url>/inference/generate`.
    pub url: String,
    /// Sent as the `X-api-key` header.
    pub token: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for InferenceClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            model: "VEGAS".to_string(),
            temperature: 0.8,
            max_output_tokens: 3200,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize)]
struct PromptVariables<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct ModelSettings {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    variables: PromptVariables<'a>,
    model: &'a str,
    model_settings: ModelSettings,
}

#[derive(Deserialize)]
struct GenerateResponse {
    ai_response: Option<String>,
}

/// Inference API client.
pub struct InferenceClient {
    client: Client,
    config: InferenceClientConfig,
}

impl InferenceClient {
    pub fn new(config: InferenceClientConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &InferenceClientConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), GENERATE_PATH)
    }

    async fn generate(
        &self,
        prompt: &str,
        settings: ModelSettings,
        timeout: Option<Duration>,
    ) -> Result<GenerateResponse, LlmError> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let body = GenerateRequest {
            variables: PromptVariables { prompt },
            model: &self.config.model,
            model_settings: settings,
        };

        let mut request = self
            .client
            .post(self.endpoint())
            .header("X-api-key", &self.config.token)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            error!(status, body = %truncate_for_log(&text, MAX_ERROR_BODY_CHARS), "inference API error");
            return Err(LlmError::Status(status, text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| LlmError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl LlmClient for InferenceClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "sending inference request"
        );
        let settings = ModelSettings {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };
        let response = self.generate(prompt, settings, None).await?;
        Ok(response.ai_response.unwrap_or_default())
    }

    async fn health_check(&self) -> Result<String, LlmError> {
        debug!(endpoint = %self.endpoint(), "testing inference connection");
        let settings = ModelSettings {
            temperature: HEALTH_TEMPERATURE,
            max_output_tokens: HEALTH_MAX_TOKENS,
        };
        let response = self
            .generate(
                HEALTH_PROMPT,
                settings,
                Some(Duration::from_secs(HEALTH_TIMEOUT_SECS)),
            )
            .await?;

        match response.ai_response {
            Some(_) => Ok("Successfully connected to inference service".to_string()),
            None => Err(LlmError::Response(
                "connected but the reply has no ai_response field".to_string(),
            )),
        }
    }

    fn is_configured(&self) -> bool {
        !self.config.url.is_empty() && !self.config.token.is_empty()
    }
}
