//! Ollama backend.
//!
//! Talks to a local Ollama server through its non-streaming
//! `POST /api/generate` endpoint.

use crate::backend::{
    LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument};

/// Response structure from the Ollama generate API.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// LLM backend for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or model is missing, or the HTTP
    /// client cannot be built.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, Report<LlmError>> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LlmError::InvalidConfig {
                reason: format!("ollama base URL must be http(s), got '{}'", config.base_url),
            }
            .into());
        }
        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "ollama model must not be empty".to_string(),
            }
            .into());
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| LlmError::InvalidConfig {
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Builds the JSON body for a generate call.
    fn request_body(&self, request: &LlmRequest) -> JsonValue {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false
        });

        if let Some(system) = &request.system {
            body["system"] = serde_json::json!(system);
        }
        if request.json_output {
            body["format"] = serde_json::json!("json");
        }

        let mut options = serde_json::Map::new();
        if let Some(temperature) = self.temperature {
            options.insert("temperature".to_string(), serde_json::json!(temperature));
        }
        if let Some(max) = request.max_tokens {
            options.insert("num_predict".to_string(), serde_json::json!(max));
        }
        if !options.is_empty() {
            body["options"] = JsonValue::Object(options);
        }

        body
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(%url, "sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Unreachable {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // The body is only diagnostic; a failed read leaves it empty.
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let data: OllamaResponse = response.json().await.map_err(|e| LlmError::Decode {
            reason: e.to_string(),
        })?;

        debug!(chars = data.response.len(), "generate request completed");

        Ok(LlmResponse {
            content: data.response,
            usage: TokenUsage {
                prompt_tokens: data.prompt_eval_count.unwrap_or_default(),
                completion_tokens: data.eval_count.unwrap_or_default(),
            },
            model: data.model,
        })
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }
}
