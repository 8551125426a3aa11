//! Error types for the server.
//!
//! - `ServerError`: startup and serving failures, reported from `main`
//! - `ApiError`: request failures rendered as HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flowsmith_workflow::DocumentError;
use std::fmt;

/// Startup and serving failures.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration could not be loaded from the environment.
    Config { details: String },
    /// The AI collaborator backend could not be constructed.
    Backend { details: String },
    /// The listener could not be bound.
    Bind { addr: String, details: String },
    /// The server stopped with an I/O error.
    Serve { details: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::Backend { details } => write!(f, "failed to construct AI backend: {details}"),
            Self::Bind { addr, details } => write!(f, "failed to bind to {addr}: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for ServerError {}

/// Request failures.
#[derive(Debug)]
pub enum ApiError {
    /// The submitted document cannot be read as a workflow.
    InvalidWorkflow { reason: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWorkflow { reason } => write!(f, "invalid workflow: {reason}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        Self::InvalidWorkflow {
            reason: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidWorkflow { reason } => {
                tracing::debug!(%reason, "rejected workflow document");
                StatusCode::BAD_REQUEST
            }
        };

        (status, self.to_string()).into_response()
    }
}
