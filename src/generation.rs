//! OpenAI-compatible chat-completions [`Generator`].
//!
//! Sends the engine's [`GenerationRequest`] as a system + user message pair
//! and returns `choices[0].message.content`.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - Other HTTP 4xx → fail immediately
//! - Network errors and timeouts → retry
//!
//! Backoff doubles from the base delay on each attempt (1s, 2s, 4s, ...).
//! Whatever the outcome, the engine answers: a final error here only
//! switches it to the local fallback text.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;

use support_rag_core::generate::{DisabledGenerator, GenerationRequest, Generator};

use crate::config::GenerationConfig;

/// Chat-completions client for DeepSeek, OpenAI, or any compatible endpoint.
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    max_retries: u32,
    backoff_base: Duration,
}

impl ChatCompletionsGenerator {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_retries: config.max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first retry delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.query },
            ],
            "temperature": self.temperature,
            "max_tokens": request.max_tokens,
            "top_p": self.top_p,
        })
    }
}

#[async_trait]
impl Generator for ChatCompletionsGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = self.request_body(request);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying generation");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .context("Invalid chat-completions response body")?;
                        return parse_completion(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(status = status.as_u16(), attempt, "generation request failed");
                        last_err = Some(anyhow!("Chat API error {}: {}", status, body_text));
                        continue;
                    }

                    bail!("Chat API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "generation request failed");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Generation failed after retries")))
    }
}

/// Extract `choices[0].message.content`, trimmed.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Invalid chat-completions response: missing choices[0].message.content"))?;

    Ok(content.trim().to_string())
}

/// Pick the generator for `config`.
///
/// Generation that is disabled, or whose API key variable is unset or
/// blank, gets a [`DisabledGenerator`] so answers come from the fallback.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    if !config.is_enabled() {
        tracing::info!("answer generation disabled; using fallback answers");
        return Ok(Box::new(DisabledGenerator));
    }

    let api_key = match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            tracing::warn!(
                api_key_env = %config.api_key_env,
                "API key not set; using fallback answers"
            );
            return Ok(Box::new(DisabledGenerator));
        }
    };

    Ok(Box::new(ChatCompletionsGenerator::new(config, api_key)?))
}
