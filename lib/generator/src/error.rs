//! Error types for the generator crate.
//!
//! None of these escape the orchestrator: each one is recorded as an
//! `AICollaboratorError` diagnostic and the run falls back to templates.

use flowsmith_ai::{LlmError, PromptError};
use std::fmt;
use std::time::Duration;

/// Why the AI path produced no usable draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The request has nothing for the model to work from.
    EmptyDescription,
    /// The prompt could not be rendered.
    Prompt(PromptError),
    /// The backend call failed.
    Backend(LlmError),
    /// The backend did not answer in time.
    Timeout { after: Duration },
    /// The answer was not a workflow document.
    MalformedResponse { reason: String },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "description is empty, AI draft skipped"),
            Self::Prompt(err) => write!(f, "prompt rendering failed: {err}"),
            Self::Backend(err) => write!(f, "AI backend failed: {err}"),
            Self::Timeout { after } => {
                write!(f, "AI backend timed out after {}s", after.as_secs_f32())
            }
            Self::MalformedResponse { reason } => {
                write!(f, "AI response is not a workflow: {reason}")
            }
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Prompt(err) => Some(err),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        Self::Backend(err)
    }
}

impl From<PromptError> for GenerationError {
    fn from(err: PromptError) -> Self {
        Self::Prompt(err)
    }
}
