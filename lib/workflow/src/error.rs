//! Error types for the workflow crate.
//!
//! Validation problems are not errors here: they are collected as
//! [`Diagnostic`](crate::diagnostic::Diagnostic) data in a report. These
//! types cover the operations that genuinely fail:
//! - `RegistryError`: node type lookups
//! - `DocumentError`: reading a workflow document

use std::fmt;

/// Errors from node type registry lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No node type is registered under this id.
    UnknownNodeType { type_id: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { type_id } => {
                write!(f, "unknown node type: {type_id}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors reading a workflow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The text is not JSON.
    InvalidJson { reason: String },
    /// The JSON value is not an object.
    NotAnObject,
    /// The object cannot be read as a workflow.
    Shape { reason: String },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { reason } => write!(f, "invalid JSON: {reason}"),
            Self::NotAnObject => write!(f, "workflow document is not a JSON object"),
            Self::Shape { reason } => write!(f, "malformed workflow document: {reason}"),
        }
    }
}

impl std::error::Error for DocumentError {}
