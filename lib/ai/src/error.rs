//! Error types for the AI crate.
//!
//! - `LlmError`: backend construction and generation calls
//! - `PromptError`: prompt rendering
//!
//! Construction errors are wrapped in a rootcause `Report` by [`crate::connect`];
//! call errors stay plain values because the generator records them as
//! diagnostics and falls back.

use std::fmt;

/// Errors from an AI backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// No provider is configured.
    Disabled,
    /// The provider could not be reached.
    Unreachable { reason: String },
    /// The provider answered with a non-success status.
    Status { status: u16, body: String },
    /// The provider's answer could not be decoded.
    Decode { reason: String },
    /// The HTTP client gave up waiting.
    Timeout,
    /// The backend configuration is unusable.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "no AI provider configured"),
            Self::Unreachable { reason } => write!(f, "AI provider unreachable: {reason}"),
            Self::Status { status, body } if body.is_empty() => {
                write!(f, "AI provider returned HTTP {status}")
            }
            Self::Status { status, body } => {
                write!(f, "AI provider returned HTTP {status}: {body}")
            }
            Self::Decode { reason } => write!(f, "undecodable AI provider response: {reason}"),
            Self::Timeout => write!(f, "AI provider request timed out"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid AI backend configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from prompt rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Required variables were not supplied.
    MissingVariables {
        template: &'static str,
        variables: Vec<&'static str>,
    },
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVariables {
                template,
                variables,
            } => write!(
                f,
                "prompt '{template}' is missing variables: {}",
                variables.join(", ")
            ),
        }
    }
}

impl std::error::Error for PromptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_omits_empty_body() {
        let bare = LlmError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(bare.to_string(), "AI provider returned HTTP 503");

        let detailed = LlmError::Status {
            status: 404,
            body: "model 'llama9' not found".to_string(),
        };
        assert_eq!(
            detailed.to_string(),
            "AI provider returned HTTP 404: model 'llama9' not found"
        );
    }

    #[test]
    fn prompt_error_lists_variables() {
        let err = PromptError::MissingVariables {
            template: "workflow_generation",
            variables: vec!["description", "node_types"],
        };
        assert_eq!(
            err.to_string(),
            "prompt 'workflow_generation' is missing variables: description, node_types"
        );
    }
}
