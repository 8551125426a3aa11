//! Workflow documents for flowsmith.
//!
//! This crate owns everything that can be said about a workflow without
//! talking to an AI collaborator:
//!
//! - **Document model**: nodes, name-keyed connections, settings and meta,
//!   tolerant of malformed drafts
//! - **Registry**: the immutable catalog of node types and their contracts
//! - **Validation**: shape, type/version, connection, content and
//!   expression passes producing a [`ValidationReport`]
//! - **Repair**: idempotent gap filling for drafts
//! - **Graph**: petgraph view used for reachability

pub mod definition;
pub mod diagnostic;
pub mod edge;
pub mod error;
pub mod expression;
pub mod graph;
mod lenient;
pub mod node;
pub mod registry;
pub mod repair;
pub mod rules;
pub mod validate;

pub use definition::{GenerationSource, Meta, Settings, Workflow};
pub use diagnostic::{Diagnostic, DiagnosticKind, ValidationReport};
pub use edge::{ConnectionTarget, Connections, EdgeRef, MAIN_SLOT};
pub use error::{DocumentError, RegistryError};
pub use expression::{ExpressionClass, ExpressionValidator};
pub use graph::ConnectionGraph;
pub use node::{Node, Parameters, Position};
pub use registry::{NodeTypeRegistry, NodeTypeSpec};
pub use repair::{AutoRepairEngine, RepairOutcome, layout_position};
pub use rules::PatternRule;
pub use validate::StructuralValidator;
