use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;

/// Fixed model parameters sent with every completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for CompletionParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// External text-completion capability.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: String,
}

/// OpenAI-compatible `/completions` client
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    organization: Option<String>,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            organization: config.organization.clone().filter(|org| !org.is_empty()),
        }
    }

    fn build_request(&self, request: &CompletionRequest<'_>) -> reqwest::RequestBuilder {
        let url = format!("{}/completions", self.base_url);

        debug!("Sending completion request to {}", url);

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }
        builder.json(request)
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<String> {
        let request = CompletionRequest {
            model: &params.model,
            prompt,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .build_request(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion API error ({}): {}", status, error_body);
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .context("No choices in completion response")
    }
}
