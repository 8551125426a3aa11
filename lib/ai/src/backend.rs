//! AI backend seam.
//!
//! The generation pipeline treats the model as an untrusted collaborator
//! behind a single call: prompt in, raw text out. Providers implement
//! [`LlmBackend`]; [`connect`] builds the configured one.

use crate::error::LlmError;
use crate::ollama::OllamaBackend;
use crate::prompt::RenderedPrompt;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Configured AI provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// No model. Every call fails, so generation always takes the
    /// template path.
    Disabled,
    /// Ollama's HTTP API.
    Ollama,
}

impl LlmProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for [`connect`].
#[derive(Debug, Clone, PartialEq)]
pub struct LlmBackendConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    /// Sampling temperature sent with every call, if set.
    pub temperature: Option<f32>,
    /// HTTP client timeout. The orchestrator bounds each call separately.
    pub request_timeout_secs: Option<u64>,
}

impl LlmBackendConfig {
    #[must_use]
    pub fn ollama(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Ollama,
            base_url: base_url.into(),
            model: model.into(),
            temperature: None,
            request_timeout_secs: None,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            provider: LlmProvider::Disabled,
            base_url: String::new(),
            model: String::new(),
            temperature: None,
            request_timeout_secs: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }
}

/// One generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// Ask the provider to constrain output to JSON where it can. The
    /// caller still parses the answer defensively.
    pub json_output: bool,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            json_output: false,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl From<RenderedPrompt> for LlmRequest {
    fn from(prompt: RenderedPrompt) -> Self {
        Self::new(prompt.user).with_system(prompt.system)
    }
}

/// Raw model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Unparsed text, possibly wrapped in prose or code fences.
    pub content: String,
    pub usage: TokenUsage,
    /// Model that answered, as reported by the provider.
    pub model: String,
}

/// Token counts reported by the provider. Zero when unreported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A model the generator can ask for a draft.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Sends one request and returns the raw answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable, rejects the
    /// request or answers with something other than text.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn provider(&self) -> LlmProvider;

    fn model(&self) -> &str;
}

/// Backend used when no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl LlmBackend for DisabledBackend {
    async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::Disabled)
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Disabled
    }

    fn model(&self) -> &str {
        "none"
    }
}

/// Builds the backend described by `config`.
///
/// # Errors
///
/// Returns an error if the provider settings are unusable.
pub fn connect(
    config: &LlmBackendConfig,
) -> flowsmith_core::Result<Arc<dyn LlmBackend>, LlmError> {
    match config.provider {
        LlmProvider::Disabled => Ok(Arc::new(DisabledBackend)),
        LlmProvider::Ollama => Ok(Arc::new(OllamaBackend::new(config)?)),
    }
}
