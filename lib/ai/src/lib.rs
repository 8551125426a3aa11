//! AI collaborator for flowsmith.
//!
//! The generation pipeline consumes a model through one narrow seam:
//!
//! - **Backend**: [`LlmBackend`] turns a prompt into raw text. Output is
//!   untrusted and parsed by the caller.
//! - **Providers**: Ollama over HTTP, or a disabled backend that always
//!   fails so generation falls back to templates.
//! - **Prompts**: `{{variable}}` templates, including the built-in
//!   workflow generation prompt.

pub mod backend;
pub mod error;
pub mod ollama;
pub mod prompt;

pub use backend::{
    DisabledBackend, LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse,
    TokenUsage, connect,
};
pub use error::{LlmError, PromptError};
pub use ollama::OllamaBackend;
pub use prompt::{PromptTemplate, RenderedPrompt, Variable, WORKFLOW_GENERATION};
