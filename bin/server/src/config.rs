//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`AI__PROVIDER=ollama`, `CACHE__TTL_SECONDS=600`).
//! Every key has a default, so an empty environment yields a working
//! server that generates from templates only.

use flowsmith_ai::{LlmBackendConfig, LlmProvider};
use flowsmith_generator::OrchestratorConfig;
use serde::Deserialize;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// AI collaborator configuration.
    #[serde(default)]
    pub ai: AiConfig,

    /// Result cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// AI collaborator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on one generation call, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// Retry invalid AI drafts through the templates before degrading.
    #[serde(default)]
    pub template_on_invalid: bool,
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_provider() -> LlmProvider {
    LlmProvider::Disabled
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_seconds() -> u64 {
    3600
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
            temperature: None,
            template_on_invalid: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl AiConfig {
    /// Backend settings. The HTTP client timeout matches the orchestrator's
    /// bound.
    #[must_use]
    pub fn backend_config(&self) -> LlmBackendConfig {
        let config = match self.provider {
            LlmProvider::Disabled => LlmBackendConfig::disabled(),
            LlmProvider::Ollama => LlmBackendConfig::ollama(&self.base_url, &self.model),
        }
        .with_request_timeout_secs(self.timeout_seconds);
        match self.temperature {
            Some(temperature) => config.with_temperature(temperature),
            None => config,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(environment())
    }

    fn from_source(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Orchestrator settings derived from this configuration.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            ai_timeout: Duration::from_secs(self.ai.timeout_seconds),
            template_on_invalid_ai: self.ai.template_on_invalid,
            cache_ttl: Duration::from_secs(self.cache.ttl_seconds),
            ..OrchestratorConfig::default()
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .try_parsing(true)
}
