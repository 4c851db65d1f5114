//! Generation backend abstraction.
//!
//! The backend is an opaque capability: `generate(prompt) -> text`.
//! [`ChatBackend`] talks to any OpenAI-compatible chat completions API
//! (the default base URL is Groq's, matching the models this assistant
//! was built for); [`DisabledBackend`] is the unconfigured placeholder.
//!
//! The API credential is read from the environment variable named in
//! config at request time and threaded through the client — never
//! assigned into process-global state.
//!
//! Retry strategy matches the embedding providers: exponential backoff
//! on 429/5xx/network errors, immediate failure on other 4xx, and a
//! bounded per-request timeout that surfaces as
//! [`Error::BackendTimeout`] so a hung backend is distinguishable from
//! a rejected request.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};

/// Trait for text generation backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync + std::fmt::Debug {
    /// Returns the model identifier (e.g. `"llama3-70b-8192"`).
    fn model_name(&self) -> &str;

    /// Run one completion for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the appropriate [`GenerationBackend`] from configuration.
pub fn create_backend(config: &GenerationConfig) -> Result<Box<dyn GenerationBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "openai" => Ok(Box::new(ChatBackend::new(config)?)),
        other => Err(Error::Config(format!(
            "Unknown generation provider: {}",
            other
        ))),
    }
}

/// Placeholder backend used when generation is not configured.
#[derive(Debug)]
pub struct DisabledBackend;

#[async_trait]
impl GenerationBackend for DisabledBackend {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Backend(
            "generation backend is disabled. Set [generation] provider in config.".to_string(),
        ))
    }
}

/// Backend for OpenAI-compatible chat completions APIs.
#[derive(Debug)]
pub struct ChatBackend {
    model: String,
    base_url: String,
    api_key_env: String,
    temperature: f32,
    timeout_secs: u64,
    max_retries: u32,
}

impl ChatBackend {
    /// Create a backend from configuration. Fails fast if the key
    /// variable is missing from the environment.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        if std::env::var(&config.api_key_env).is_err() {
            return Err(Error::Config(format!(
                "{} environment variable not set",
                config.api_key_env
            )));
        }

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl GenerationBackend for ChatBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = std::env::var(&self.api_key_env)
            .map_err(|_| Error::Backend(format!("{} not set", self.api_key_env)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| Error::Backend(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "user", "content": prompt}
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
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
                            .map_err(|e| Error::Backend(e.to_string()))?;
                        return parse_chat_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(Error::Backend(format!(
                            "chat API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(Error::Backend(format!(
                        "chat API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(if e.is_timeout() {
                        Error::BackendTimeout(format!(
                            "generation request exceeded {}s",
                            self.timeout_secs
                        ))
                    } else {
                        Error::Backend(e.to_string())
                    });
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Backend("generation failed after retries".to_string())))
    }
}

/// Extract `choices[0].message.content` from a chat completions
/// response. An empty completion is an error, never a silent success.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| Error::Backend("invalid chat response: missing content".to_string()))?;

    let text = content.trim();
    if text.is_empty() {
        return Err(Error::Backend(
            "chat backend returned an empty completion".to_string(),
        ));
    }

    Ok(text.to_string())
}
