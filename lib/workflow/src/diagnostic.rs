//! Validation findings.
//!
//! Every problem the engine finds is data, never a raised error, so a
//! report can always be produced and carried into `meta.diagnostics`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    SchemaShape,
    UnknownNodeType,
    UnsupportedVersion,
    MissingParameter,
    MissingCredential,
    DanglingConnection,
    UnreachableNode,
    PlaceholderValue,
    InvalidExpression,
    AiCollaborator,
}

impl DiagnosticKind {
    /// Stable name used in reports and diagnostic trails.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SchemaShape => "SchemaShapeError",
            Self::UnknownNodeType => "UnknownNodeTypeError",
            Self::UnsupportedVersion => "UnsupportedVersionError",
            Self::MissingParameter => "MissingParameterError",
            Self::MissingCredential => "MissingCredentialError",
            Self::DanglingConnection => "DanglingConnectionError",
            Self::UnreachableNode => "UnreachableNodeError",
            Self::PlaceholderValue => "PlaceholderValueError",
            Self::InvalidExpression => "InvalidExpressionError",
            Self::AiCollaborator => "AICollaboratorError",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding, optionally attributed to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            node: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_node(
        kind: DiagnosticKind,
        node: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            node: Some(node.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{} [{}]: {}", self.kind, node, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Outcome of validating one workflow.
///
/// The workflow is acceptable exactly when `errors` is empty. Warnings
/// never block acceptance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn warning(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }

    /// Returns whether any error of `kind` was reported.
    #[must_use]
    pub fn has_error(&self, kind: DiagnosticKind) -> bool {
        self.errors.iter().any(|d| d.kind == kind)
    }

    #[must_use]
    pub fn has_warning(&self, kind: DiagnosticKind) -> bool {
        self.warnings.iter().any(|d| d.kind == kind)
    }

    /// Returns the errors of `kind`.
    pub fn errors_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().filter(move |d| d.kind == kind)
    }

    /// Renders errors then warnings as one line each.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(ToString::to_string)
            .chain(self.warnings.iter().map(|w| format!("warning: {w}")))
            .collect()
    }
}
