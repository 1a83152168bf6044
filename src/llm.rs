//! Language-model responder backed by the Ollama generate API

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::turn::Responder;
use crate::{Error, Result};

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(serde::Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generates replies through a local Ollama server
pub struct OllamaResponder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    system_prompt: String,
    temperature: f32,
    num_ctx: u32,
}

impl OllamaResponder {
    /// Create a responder from LLM configuration
    #[must_use]
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            num_ctx: config.num_ctx,
        }
    }
}

#[async_trait]
impl Responder for OllamaResponder {
    async fn respond(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: &self.system_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_ctx: self.num_ctx,
            },
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "requesting generation");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "generate request failed");
                Error::Generation(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Ollama API error");
            return Err(Error::Generation(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid response: {e}")))?;

        Ok(result.response.trim().to_string())
    }
}
